//! In-process identity provider and profile store.
//!
//! Behaves like the managed backend closely enough for tests and for
//! `--backend memory`: passwords shorter than six characters are weak, codes
//! are single-use ULIDs recorded in an outbox instead of being emailed.

use super::{
    IdentityProvider, ProfileStore, ProviderError, ProviderErrorCode, SessionBroadcaster,
    RecordAccess, SessionSubscription, StoreError,
};
use crate::{profile::ProfileRecord, session::Identity};
use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use ulid::Ulid;

const WEAK_PASSWORD_LEN: usize = 6;

/// Messages the managed backend would have emailed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundMessage {
    Verification { email: String, code: String },
    PasswordReset { email: String, code: String },
}

impl OutboundMessage {
    #[must_use]
    pub fn email(&self) -> &str {
        match self {
            Self::Verification { email, .. } | Self::PasswordReset { email, .. } => email,
        }
    }

    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Verification { code, .. } | Self::PasswordReset { code, .. } => code,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CodePurpose {
    Verification,
    PasswordReset,
}

#[derive(Debug)]
struct IssuedCode {
    email: String,
    purpose: CodePurpose,
    expired: bool,
}

struct Account {
    identity: Identity,
    password: SecretString,
}

#[derive(Default)]
struct ProviderState {
    accounts: HashMap<String, Account>,
    staged: Option<Identity>,
    codes: HashMap<String, IssuedCode>,
    outbox: Vec<OutboundMessage>,
    messages_sent: usize,
}

/// Identity provider kept entirely in memory.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    state: Mutex<ProviderState>,
    sessions: SessionBroadcaster,
    latency: Option<Duration>,
    registration_disabled: bool,
    message_limit: Option<usize>,
    unavailable: AtomicBool,
}

impl InMemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account without going through sign-up.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str, email_verified: bool) -> Self {
        {
            let mut state = self.lock();
            let mut identity = Identity::new(Ulid::new().to_string(), email, email_verified);
            identity.created_at = Some(Utc::now());
            state.accounts.insert(
                email.to_string(),
                Account {
                    identity,
                    password: SecretString::from(password.to_string()),
                },
            );
        }
        self
    }

    /// Delay every provider call, to exercise pending submissions.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    #[must_use]
    pub fn with_registration_disabled(mut self) -> Self {
        self.registration_disabled = true;
        self
    }

    /// Reject outbound messages with `TooManyRequests` once `limit` were sent.
    #[must_use]
    pub fn with_message_limit(mut self, limit: usize) -> Self {
        self.message_limit = Some(limit);
        self
    }

    /// Make every call fail with a transport error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Mark an account verified as if the user clicked the emailed link in
    /// another browser. Returns false for unknown accounts.
    pub fn complete_verification(&self, email: &str) -> bool {
        let mut state = self.lock();
        state.accounts.get_mut(email).is_some_and(|account| {
            account.identity.email_verified = true;
            true
        })
    }

    /// Let an issued code lapse.
    pub fn expire_code(&self, code: &str) {
        if let Some(issued) = self.lock().codes.get_mut(code) {
            issued.expired = true;
        }
    }

    #[must_use]
    pub fn outbox(&self) -> Vec<OutboundMessage> {
        self.lock().outbox.clone()
    }

    /// Code of the most recent message sent to `email`.
    #[must_use]
    pub fn last_code(&self, email: &str) -> Option<String> {
        self.lock()
            .outbox
            .iter()
            .rev()
            .find(|message| message.email() == email)
            .map(|message| message.code().to_string())
    }

    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.sessions.current()
    }

    #[must_use]
    pub fn has_staged_session(&self) -> bool {
        self.lock().staged.is_some()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sessions.subscriber_count()
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn round_trip(&self) -> Result<(), ProviderError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProviderError::Transport(
                "in-memory provider unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn issue_code(
        &self,
        state: &mut ProviderState,
        email: &str,
        purpose: CodePurpose,
    ) -> Result<(), ProviderError> {
        if self
            .message_limit
            .is_some_and(|limit| state.messages_sent >= limit)
        {
            return Err(rejected(ProviderErrorCode::TooManyRequests));
        }
        let code = Ulid::new().to_string();
        state.codes.insert(
            code.clone(),
            IssuedCode {
                email: email.to_string(),
                purpose,
                expired: false,
            },
        );
        let email = email.to_string();
        state.outbox.push(match purpose {
            CodePurpose::Verification => OutboundMessage::Verification { email, code },
            CodePurpose::PasswordReset => OutboundMessage::PasswordReset { email, code },
        });
        state.messages_sent += 1;
        Ok(())
    }
}

const fn rejected(code: ProviderErrorCode) -> ProviderError {
    ProviderError::Rejected(code)
}

fn check_code(
    state: &ProviderState,
    code: &str,
    purpose: CodePurpose,
) -> Result<String, ProviderError> {
    match state.codes.get(code) {
        Some(issued) if issued.purpose == purpose && issued.expired => {
            Err(rejected(ProviderErrorCode::ExpiredActionCode))
        }
        Some(issued) if issued.purpose == purpose => Ok(issued.email.clone()),
        _ => Err(rejected(ProviderErrorCode::InvalidActionCode)),
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn subscribe_session_changes(&self) -> SessionSubscription {
        self.sessions.subscribe()
    }

    async fn create_account(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError> {
        self.round_trip().await?;
        let identity = {
            let mut state = self.lock();
            if self.registration_disabled {
                return Err(rejected(ProviderErrorCode::OperationNotAllowed));
            }
            if !email.contains('@') {
                return Err(rejected(ProviderErrorCode::InvalidEmail));
            }
            if state.accounts.contains_key(email) {
                return Err(rejected(ProviderErrorCode::EmailAlreadyInUse));
            }
            if password.expose_secret().chars().count() < WEAK_PASSWORD_LEN {
                return Err(rejected(ProviderErrorCode::WeakPassword));
            }

            let now = Utc::now();
            let mut identity = Identity::new(Ulid::new().to_string(), email, false);
            identity.created_at = Some(now);
            identity.last_sign_in_at = Some(now);
            state.accounts.insert(
                email.to_string(),
                Account {
                    identity: identity.clone(),
                    password: password.clone(),
                },
            );
            state.staged = None;
            identity
        };

        self.sessions.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError> {
        self.round_trip().await?;
        let mut state = self.lock();
        let account = state
            .accounts
            .get_mut(email)
            .ok_or_else(|| rejected(ProviderErrorCode::UserNotFound))?;
        if account.password.expose_secret() != password.expose_secret() {
            return Err(rejected(ProviderErrorCode::InvalidCredential));
        }

        account.identity.last_sign_in_at = Some(Utc::now());
        let identity = account.identity.clone();
        state.staged = Some(identity.clone());
        Ok(identity)
    }

    async fn establish_session(&self, identity: &Identity) -> Result<(), ProviderError> {
        self.round_trip().await?;
        let staged = {
            let mut state = self.lock();
            match state.staged.take() {
                Some(staged) if staged.id == identity.id => staged,
                other => {
                    state.staged = other;
                    return Err(ProviderError::NoStagedSession);
                }
            }
        };
        self.sessions.publish(Some(staged));
        Ok(())
    }

    fn discard_staged_session(&self) {
        self.lock().staged = None;
    }

    async fn sign_out_current(&self) -> Result<(), ProviderError> {
        self.round_trip().await?;
        self.lock().staged = None;
        if self.sessions.current().is_some() {
            self.sessions.publish(None);
        }
        Ok(())
    }

    async fn send_verification_message(&self, identity: &Identity) -> Result<(), ProviderError> {
        self.round_trip().await?;
        let mut state = self.lock();
        if !state.accounts.contains_key(&identity.email) {
            return Err(rejected(ProviderErrorCode::UserNotFound));
        }
        self.issue_code(&mut state, &identity.email, CodePurpose::Verification)
    }

    async fn apply_verification_code(&self, code: &str) -> Result<(), ProviderError> {
        self.round_trip().await?;
        let mut state = self.lock();
        let email = check_code(&state, code, CodePurpose::Verification)?;
        state.codes.remove(code);
        let account = state
            .accounts
            .get_mut(&email)
            .ok_or_else(|| rejected(ProviderErrorCode::UserNotFound))?;
        account.identity.email_verified = true;
        Ok(())
    }

    async fn send_password_reset_message(&self, email: &str) -> Result<(), ProviderError> {
        self.round_trip().await?;
        let mut state = self.lock();
        if !email.contains('@') {
            return Err(rejected(ProviderErrorCode::InvalidEmail));
        }
        if !state.accounts.contains_key(email) {
            return Err(rejected(ProviderErrorCode::UserNotFound));
        }
        self.issue_code(&mut state, email, CodePurpose::PasswordReset)
    }

    async fn verify_reset_code(&self, code: &str) -> Result<String, ProviderError> {
        self.round_trip().await?;
        check_code(&self.lock(), code, CodePurpose::PasswordReset)
    }

    async fn confirm_password_reset(
        &self,
        code: &str,
        new_password: &SecretString,
    ) -> Result<(), ProviderError> {
        self.round_trip().await?;
        let mut state = self.lock();
        let email = check_code(&state, code, CodePurpose::PasswordReset)?;
        if new_password.expose_secret().chars().count() < WEAK_PASSWORD_LEN {
            return Err(rejected(ProviderErrorCode::WeakPassword));
        }
        state.codes.remove(code);
        let account = state
            .accounts
            .get_mut(&email)
            .ok_or_else(|| rejected(ProviderErrorCode::UserNotFound))?;
        account.password = new_password.clone();
        Ok(())
    }
}

/// Profile records kept in a map, with switchable failure.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    records: Mutex<HashMap<String, ProfileRecord>>,
    failing: AtomicBool,
    writes: Mutex<usize>,
}

impl InMemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_record(self, identity_id: &str, record: ProfileRecord) -> Self {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity_id.to_string(), record);
        self
    }

    /// Make reads and writes fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    #[must_use]
    pub fn record(&self, identity_id: &str) -> Option<ProfileRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity_id)
            .cloned()
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Transport(
                "in-memory store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn authorize(&self, identity_id: &str) -> Result<RecordAccess, StoreError> {
        Ok(RecordAccess::new(identity_id, None))
    }

    async fn read_record(
        &self,
        access: &RecordAccess,
    ) -> Result<Option<ProfileRecord>, StoreError> {
        self.check_available()?;
        Ok(self.record(access.identity_id()))
    }

    async fn write_record(
        &self,
        access: &RecordAccess,
        record: &ProfileRecord,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(access.identity_id().to_string(), record.clone());
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
