//! Narrow async interfaces to the managed identity backend and profile store.
//!
//! Everything durable lives behind these traits. Implementations must never log
//! passwords, ID tokens or out-of-band codes.
//!
//! Flow Overview: `create_account` signs the new account in and notifies
//! subscribers. `authenticate` only checks credentials and stages the session;
//! nothing is published until `establish_session` promotes it. `sign_out_current`
//! drops both the staged and the current session and publishes `None`.

mod broadcast;
pub mod firebase;
pub mod memory;

pub use broadcast::{SessionBroadcaster, SessionSubscription};

use crate::{profile::ProfileRecord, session::Identity};
use async_trait::async_trait;
use secrecy::SecretString;
use std::fmt;
use thiserror::Error;

/// Error codes reported by the identity backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderErrorCode {
    EmailAlreadyInUse,
    InvalidEmail,
    OperationNotAllowed,
    WeakPassword,
    UserNotFound,
    InvalidCredential,
    UserDisabled,
    TooManyRequests,
    ExpiredActionCode,
    InvalidActionCode,
    /// A code this client does not know yet; kept verbatim.
    Other(String),
}

impl ProviderErrorCode {
    /// Classify an Identity Toolkit REST error message such as
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    #[must_use]
    pub fn from_rest_message(message: &str) -> Self {
        let code = message
            .split([' ', ':'])
            .find(|part| !part.is_empty())
            .unwrap_or_default();

        match code {
            "EMAIL_EXISTS" => Self::EmailAlreadyInUse,
            "INVALID_EMAIL" | "MISSING_EMAIL" => Self::InvalidEmail,
            "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" | "ADMIN_ONLY_OPERATION" => {
                Self::OperationNotAllowed
            }
            "WEAK_PASSWORD" => Self::WeakPassword,
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => Self::UserNotFound,
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => Self::InvalidCredential,
            "USER_DISABLED" => Self::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" | "QUOTA_EXCEEDED" => Self::TooManyRequests,
            "EXPIRED_OOB_CODE" => Self::ExpiredActionCode,
            "INVALID_OOB_CODE" => Self::InvalidActionCode,
            _ => Self::Other(message.trim().to_string()),
        }
    }

    /// Stable `auth/*` code, matching the browser SDK naming.
    #[must_use]
    pub fn as_code(&self) -> &str {
        match self {
            Self::EmailAlreadyInUse => "auth/email-already-in-use",
            Self::InvalidEmail => "auth/invalid-email",
            Self::OperationNotAllowed => "auth/operation-not-allowed",
            Self::WeakPassword => "auth/weak-password",
            Self::UserNotFound => "auth/user-not-found",
            Self::InvalidCredential => "auth/invalid-credential",
            Self::UserDisabled => "auth/user-disabled",
            Self::TooManyRequests => "auth/too-many-requests",
            Self::ExpiredActionCode => "auth/expired-action-code",
            Self::InvalidActionCode => "auth/invalid-action-code",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_code())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("identity provider rejected the request: {0}")]
    Rejected(ProviderErrorCode),
    #[error("identity provider unreachable: {0}")]
    Transport(String),
    #[error("unexpected identity provider response: {0}")]
    Response(String),
    #[error("no staged sign-in for this identity")]
    NoStagedSession,
    #[error("no signed-in identity")]
    NoActiveSession,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("profile store unreachable: {0}")]
    Transport(String),
    #[error("profile store denied access")]
    Unauthorized,
    #[error("malformed profile record: {0}")]
    Malformed(String),
}

/// Identity backend operations consumed by the auth service and session holder.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribe to session changes. The current identity (or `None`) is
    /// delivered first, then one event per sign-in or sign-out. Dropping the
    /// subscription unsubscribes.
    fn subscribe_session_changes(&self) -> SessionSubscription;

    /// Create an account and make it the current session.
    async fn create_account(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError>;

    /// Check credentials and stage the session without publishing it.
    async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError>;

    /// Promote the staged session for `identity` and notify subscribers.
    async fn establish_session(&self, identity: &Identity) -> Result<(), ProviderError>;

    /// Forget a staged session without touching the current one.
    fn discard_staged_session(&self);

    async fn sign_out_current(&self) -> Result<(), ProviderError>;

    async fn send_verification_message(&self, identity: &Identity) -> Result<(), ProviderError>;

    /// Complete email verification from an out-of-band code.
    async fn apply_verification_code(&self, code: &str) -> Result<(), ProviderError>;

    async fn send_password_reset_message(&self, email: &str) -> Result<(), ProviderError>;

    /// Validate a reset code and return the account email it belongs to.
    async fn verify_reset_code(&self, code: &str) -> Result<String, ProviderError>;

    async fn confirm_password_reset(
        &self,
        code: &str,
        new_password: &SecretString,
    ) -> Result<(), ProviderError>;
}

/// Access to one identity's record, captured when a profile operation starts.
/// Signing out afterwards does not revoke it for that operation.
#[derive(Clone, Debug)]
pub struct RecordAccess {
    identity_id: String,
    token: Option<SecretString>,
}

impl RecordAccess {
    #[must_use]
    pub fn new(identity_id: impl Into<String>, token: Option<SecretString>) -> Self {
        Self {
            identity_id: identity_id.into(),
            token,
        }
    }

    #[must_use]
    pub fn identity_id(&self) -> &str {
        &self.identity_id
    }

    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }
}

/// Per-identity key-value profile storage.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Capture whatever the store needs to reach `identity_id`'s record.
    async fn authorize(&self, identity_id: &str) -> Result<RecordAccess, StoreError>;

    async fn read_record(&self, access: &RecordAccess)
    -> Result<Option<ProfileRecord>, StoreError>;

    async fn write_record(
        &self,
        access: &RecordAccess,
        record: &ProfileRecord,
    ) -> Result<(), StoreError>;
}

/// Lends a store the bearer token of a signed-in (or staged) identity.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn id_token(&self, identity_id: &str) -> Option<SecretString>;
}
