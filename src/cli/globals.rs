use crate::auth::Locale;
use secrecy::SecretString;
use std::{fmt, str::FromStr, time::Duration};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Firebase,
    /// Ephemeral in-process backend; state is lost when the command exits.
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "firebase" => Ok(Self::Firebase),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unsupported backend: {other}")),
        }
    }
}

/// Settings shared by every command.
#[derive(Clone)]
pub struct GlobalArgs {
    pub backend: Backend,
    pub api_key: SecretString,
    pub auth_url: String,
    pub database_url: Option<String>,
    pub locale: Locale,
    pub timeout: Duration,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(backend: Backend, auth_url: String) -> Self {
        Self {
            backend,
            api_key: SecretString::default(),
            auth_url,
            database_url: None,
            locale: Locale::default(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn set_api_key(&mut self, api_key: SecretString) {
        self.api_key = api_key;
    }
}

impl fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("backend", &self.backend)
            .field("api_key", &"***")
            .field("auth_url", &self.auth_url)
            .field("database_url", &self.database_url)
            .field("locale", &self.locale)
            .field("timeout", &self.timeout)
            .finish()
    }
}
