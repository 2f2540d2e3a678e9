use crate::{
    auth::Locale,
    cli::globals::{Backend, GlobalArgs},
    provider::firebase::DEFAULT_AUTH_URL,
};
use anyhow::anyhow;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_BACKEND: &str = "backend";
pub const ARG_API_KEY: &str = "api-key";
pub const ARG_AUTH_URL: &str = "auth-url";
pub const ARG_DATABASE_URL: &str = "database-url";
pub const ARG_LOCALE: &str = "locale";
pub const ARG_TIMEOUT: &str = "timeout";

#[derive(Clone)]
pub struct Options {
    pub backend: Backend,
    pub api_key: Option<SecretString>,
    pub auth_url: String,
    pub database_url: Option<String>,
    pub locale: Locale,
    pub timeout_seconds: u64,
}

impl Options {
    /// Parse backend arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a value cannot be interpreted or the firebase
    /// backend is selected without an API key.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let backend = get_non_empty(ARG_BACKEND)
            .as_deref()
            .unwrap_or("firebase")
            .parse::<Backend>()
            .map_err(|e| anyhow!(e))?;
        let locale = get_non_empty(ARG_LOCALE)
            .map(|value| value.parse::<Locale>().map_err(|e| anyhow!(e)))
            .transpose()?
            .unwrap_or_default();
        let api_key = get_non_empty(ARG_API_KEY).map(SecretString::from);

        if backend == Backend::Firebase && api_key.is_none() {
            anyhow::bail!("missing required argument: --{ARG_API_KEY} (required for the firebase backend)");
        }

        Ok(Self {
            backend,
            api_key,
            auth_url: get_non_empty(ARG_AUTH_URL).unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            database_url: get_non_empty(ARG_DATABASE_URL),
            locale,
            timeout_seconds: matches.get_one::<u64>(ARG_TIMEOUT).copied().unwrap_or(15),
        })
    }

    #[must_use]
    pub fn into_globals(self) -> GlobalArgs {
        let mut globals = GlobalArgs::new(self.backend, self.auth_url);
        if let Some(api_key) = self.api_key {
            globals.set_api_key(api_key);
        }
        globals.database_url = self.database_url;
        globals.locale = self.locale;
        globals.timeout = Duration::from_secs(self.timeout_seconds);
        globals
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BACKEND)
                .long(ARG_BACKEND)
                .help("Identity backend")
                .long_help(
                    "Identity backend. `memory` keeps accounts in process and forgets them on exit; it is only useful to try the flows.",
                )
                .env("AUTHGATE_BACKEND")
                .value_parser(["firebase", "memory"])
                .default_value("firebase")
                .global(true),
        )
        .arg(
            Arg::new(ARG_API_KEY)
                .long(ARG_API_KEY)
                .help("Web API key of the identity project")
                .env("AUTHGATE_API_KEY")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_AUTH_URL)
                .long(ARG_AUTH_URL)
                .help("Identity Toolkit base URL")
                .env("AUTHGATE_AUTH_URL")
                .default_value(DEFAULT_AUTH_URL)
                .global(true),
        )
        .arg(
            Arg::new(ARG_DATABASE_URL)
                .long(ARG_DATABASE_URL)
                .help("Realtime Database root URL, required for profile commands")
                .env("AUTHGATE_DATABASE_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_LOCALE)
                .long(ARG_LOCALE)
                .help("Language of user-facing messages")
                .env("AUTHGATE_LOCALE")
                .value_parser(["en", "zh-TW"])
                .default_value("zh-TW")
                .global(true),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long(ARG_TIMEOUT)
                .help("Backend request timeout in seconds")
                .env("AUTHGATE_TIMEOUT_SECONDS")
                .default_value("15")
                .value_parser(clap::value_parser!(u64))
                .global(true),
        )
}
