use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated account as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    /// Only ever moves from `false` to `true` for a given account.
    pub email_verified: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl Identity {
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>, email_verified: bool) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            email_verified,
            created_at: None,
            last_sign_in_at: None,
        }
    }
}

/// Immutable view of the session at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    identity: Option<Identity>,
    initializing: bool,
}

impl SessionSnapshot {
    /// State before the provider has reported anything.
    #[must_use]
    pub const fn initializing() -> Self {
        Self {
            identity: None,
            initializing: true,
        }
    }

    #[must_use]
    pub const fn resolved(identity: Option<Identity>) -> Self {
        Self {
            identity,
            initializing: false,
        }
    }

    #[must_use]
    pub const fn current_identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub const fn is_initializing(&self) -> bool {
        self.initializing
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    /// Signed in with a verified email address.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.identity
            .as_ref()
            .is_some_and(|identity| identity.email_verified)
    }
}
