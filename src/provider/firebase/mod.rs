//! Firebase backend: Identity Toolkit v1 REST for accounts and the Realtime
//! Database REST API for profiles.

mod database;
mod identity;

pub use database::RealtimeDatabase;
pub use identity::FirebaseAuth;

use super::{ProviderError, ProviderErrorCode};
use reqwest::StatusCode;
use secrecy::SecretString;
use serde::Deserialize;
use std::{fmt, time::Duration};

pub const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct FirebaseConfig {
    pub api_key: SecretString,
    pub auth_url: String,
    pub timeout: Duration,
}

impl FirebaseConfig {
    #[must_use]
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            auth_url: DEFAULT_AUTH_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `{auth_url}/v1/accounts:{method}`; the API key goes in the query.
    #[must_use]
    pub fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1/accounts:{method}",
            self.auth_url.trim_end_matches('/')
        )
    }
}

impl fmt::Debug for FirebaseConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FirebaseConfig")
            .field("api_key", &"[REDACTED]")
            .field("auth_url", &self.auth_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Deserialize)]
struct RestErrorBody {
    error: RestErrorDetail,
}

#[derive(Deserialize)]
struct RestErrorDetail {
    message: String,
}

/// Turn a non-success Identity Toolkit response into a provider error.
fn rest_error(status: StatusCode, body: &str) -> ProviderError {
    match serde_json::from_str::<RestErrorBody>(body) {
        Ok(parsed) => ProviderError::Rejected(ProviderErrorCode::from_rest_message(
            &parsed.error.message,
        )),
        Err(_) => ProviderError::Response(format!("{status} {}", body.trim())),
    }
}

fn transport(err: reqwest::Error) -> ProviderError {
    ProviderError::Transport(err.without_url().to_string())
}
