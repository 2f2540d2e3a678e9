use super::{
    errors::{AuthError, AuthOperation},
    pending::PendingOperations,
    validation::{
        require_code, require_confirmation, require_email, require_new_password, require_password,
    },
};
use crate::{
    provider::{IdentityProvider, ProviderError},
    session::Identity,
};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignUpOutcome {
    /// The new, still unverified account. A verification message was sent.
    pub identity: Identity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent,
    AlreadyVerified,
}

/// User-initiated account operations. Every provider failure is mapped onto
/// [`AuthError`] here; nothing else in the crate sees a `ProviderError`.
#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    pending: PendingOperations,
}

impl AuthService {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            pending: PendingOperations::new(),
        }
    }

    #[must_use]
    pub const fn pending(&self) -> &PendingOperations {
        &self.pending
    }

    /// Create an account, sign it in (unverified) and send the verification
    /// message.
    ///
    /// # Errors
    /// `AccountExists`, `InvalidEmailFormat`, `RegistrationDisabled`,
    /// `WeakPassword`, `InvalidInput` or `UnknownAuth`.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignUpOutcome, AuthError> {
        let email = require_email(email)?;
        require_password(password)?;
        let _pending = self.pending.begin(AuthOperation::SignUp)?;

        let identity = self
            .provider
            .create_account(&email, password)
            .await
            .map_err(|err| map_failure(AuthOperation::SignUp, &err))?;

        info!(identity_id = %identity.id, "account created");

        // The account stays; the failure is reported so the user can resend.
        if let Err(err) = self.provider.send_verification_message(&identity).await {
            warn!(identity_id = %identity.id, "verification message not sent: {err}");
            return Err(AuthError::UnknownAuth {
                operation: AuthOperation::SignUp,
                detail: err.to_string(),
            });
        }

        Ok(SignUpOutcome { identity })
    }

    /// [`Self::sign_up`] after checking the password confirmation.
    ///
    /// # Errors
    /// Same as [`Self::sign_up`], plus `InvalidInput` on mismatch.
    pub async fn sign_up_confirmed(
        &self,
        email: &str,
        password: &SecretString,
        confirmation: &SecretString,
    ) -> Result<SignUpOutcome, AuthError> {
        require_confirmation(password, confirmation)?;
        self.sign_up(email, password).await
    }

    /// Two-phase sign-in: credentials are checked first and the session is only
    /// made current for a verified account.
    ///
    /// # Errors
    /// `EmailNotVerified` (the staged session is signed out first),
    /// `InvalidCredentials`, `InvalidInput` or `UnknownAuth`.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, AuthError> {
        let email = require_email(email)?;
        require_password(password)?;
        let _pending = self
            .pending
            .begin_exclusive(AuthOperation::SignIn, &[AuthOperation::ResendVerification])?;

        let identity = self
            .provider
            .authenticate(&email, password)
            .await
            .map_err(|err| map_failure(AuthOperation::SignIn, &err))?;

        if !identity.email_verified {
            if let Err(err) = self.provider.sign_out_current().await {
                // The staged session is never published, so this only leaves a
                // stale token behind.
                warn!(identity_id = %identity.id, "sign-out after unverified sign-in failed: {err}");
                self.provider.discard_staged_session();
            }
            info!(identity_id = %identity.id, "sign-in refused: email not verified");
            return Err(AuthError::EmailNotVerified);
        }

        self.provider
            .establish_session(&identity)
            .await
            .map_err(|err| map_failure(AuthOperation::SignIn, &err))?;

        info!(identity_id = %identity.id, "signed in");
        Ok(identity)
    }

    /// # Errors
    /// `UnknownAuth` when the provider fails.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let _pending = self.pending.begin(AuthOperation::SignOut)?;
        self.provider
            .sign_out_current()
            .await
            .map_err(|err| map_failure(AuthOperation::SignOut, &err))?;
        debug!("signed out");
        Ok(())
    }

    /// Send the verification message again for an account that is not signed
    /// in. The session is never made current.
    ///
    /// # Errors
    /// `InvalidCredentials`, `RateLimited`, `InvalidInput` or `UnknownAuth`.
    #[instrument(skip(self, password))]
    pub async fn resend_verification(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<ResendOutcome, AuthError> {
        let email = require_email(email)?;
        require_password(password)?;
        // Both stage a session on the provider, so they never overlap.
        let _pending = self
            .pending
            .begin_exclusive(AuthOperation::ResendVerification, &[AuthOperation::SignIn])?;

        let identity = self
            .provider
            .authenticate(&email, password)
            .await
            .map_err(|err| map_failure(AuthOperation::ResendVerification, &err))?;

        let result = self.send_verification(&identity).await;
        self.provider.discard_staged_session();
        result
    }

    /// Send the verification message again for an identity that is already
    /// current, e.g. right after sign-up.
    ///
    /// # Errors
    /// `RateLimited` or `UnknownAuth`.
    #[instrument(skip(self, identity), fields(identity_id = %identity.id))]
    pub async fn resend_verification_for(
        &self,
        identity: &Identity,
    ) -> Result<ResendOutcome, AuthError> {
        let _pending = self.pending.begin(AuthOperation::ResendVerification)?;
        self.send_verification(identity).await
    }

    async fn send_verification(&self, identity: &Identity) -> Result<ResendOutcome, AuthError> {
        if identity.email_verified {
            return Ok(ResendOutcome::AlreadyVerified);
        }
        self.provider
            .send_verification_message(identity)
            .await
            .map_err(|err| map_failure(AuthOperation::ResendVerification, &err))?;
        info!(identity_id = %identity.id, "verification message sent");
        Ok(ResendOutcome::Sent)
    }

    /// Complete email verification from the code in an emailed link.
    ///
    /// # Errors
    /// `ExpiredOrInvalidVerificationLink`, `InvalidInput` or `UnknownAuth`.
    #[instrument(skip_all)]
    pub async fn apply_verification_code(&self, code: &str) -> Result<(), AuthError> {
        let code = require_code(code)?;
        let _pending = self.pending.begin(AuthOperation::ApplyVerification)?;
        self.provider
            .apply_verification_code(code)
            .await
            .map_err(|err| map_failure(AuthOperation::ApplyVerification, &err))?;
        info!("email verified");
        Ok(())
    }

    /// # Errors
    /// `AccountNotFound`, `InvalidEmailFormat`, `RateLimited`, `InvalidInput`
    /// or `UnknownAuth`.
    #[instrument(skip(self))]
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = require_email(email)?;
        let _pending = self.pending.begin(AuthOperation::RequestPasswordReset)?;
        self.provider
            .send_password_reset_message(&email)
            .await
            .map_err(|err| map_failure(AuthOperation::RequestPasswordReset, &err))?;
        info!("password reset message sent");
        Ok(())
    }

    /// Validate a reset code before asking for a new password. Returns the
    /// email of the account being reset.
    ///
    /// # Errors
    /// `ExpiredOrInvalidResetLink`, `InvalidInput` or `UnknownAuth`.
    #[instrument(skip_all)]
    pub async fn verify_reset_code(&self, code: &str) -> Result<String, AuthError> {
        let code = require_code(code)?;
        let _pending = self.pending.begin(AuthOperation::VerifyResetCode)?;
        self.provider
            .verify_reset_code(code)
            .await
            .map_err(|err| map_failure(AuthOperation::VerifyResetCode, &err))
    }

    /// # Errors
    /// `ExpiredOrInvalidResetLink`, `WeakPassword`, `InvalidInput` or
    /// `UnknownAuth`.
    #[instrument(skip_all)]
    pub async fn confirm_password_reset(
        &self,
        code: &str,
        new_password: &SecretString,
        confirmation: &SecretString,
    ) -> Result<(), AuthError> {
        let code = require_code(code)?;
        require_new_password(new_password, confirmation)?;
        let _pending = self.pending.begin(AuthOperation::ConfirmPasswordReset)?;
        self.provider
            .confirm_password_reset(code, new_password)
            .await
            .map_err(|err| map_failure(AuthOperation::ConfirmPasswordReset, &err))?;
        info!("password reset");
        Ok(())
    }
}

fn map_failure(operation: AuthOperation, err: &ProviderError) -> AuthError {
    let mapped = AuthError::from_provider(operation, err);
    if matches!(mapped, AuthError::UnknownAuth { .. }) {
        warn!(%operation, "provider failure: {err}");
    } else {
        debug!(%operation, "provider rejected request: {err}");
    }
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::errors::InputProblem,
        provider::memory::{InMemoryIdentityProvider, OutboundMessage},
    };
    use anyhow::Result;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn service() -> (Arc<InMemoryIdentityProvider>, AuthService) {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let service = AuthService::new(provider.clone());
        (provider, service)
    }

    #[tokio::test]
    async fn sign_up_sends_verification() -> Result<()> {
        let (provider, service) = service();
        let outcome = service.sign_up(" A@X.com ", &secret("secret1")).await?;

        assert_eq!(outcome.identity.email, "a@x.com");
        assert!(!outcome.identity.email_verified);
        assert!(matches!(
            provider.outbox().as_slice(),
            [OutboundMessage::Verification { email, .. }] if email == "a@x.com"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn sign_up_fails_when_verification_is_not_sent() -> Result<()> {
        let provider = Arc::new(InMemoryIdentityProvider::new().with_message_limit(0));
        let service = AuthService::new(provider.clone());

        let result = service.sign_up("a@x.com", &secret("secret1")).await;
        assert!(matches!(
            result,
            Err(AuthError::UnknownAuth {
                operation: AuthOperation::SignUp,
                ..
            })
        ));
        assert!(provider.outbox().is_empty());
        // The account exists, so the user can still sign in and resend later.
        assert_eq!(
            service.sign_up("a@x.com", &secret("secret1")).await,
            Err(AuthError::AccountExists)
        );
        Ok(())
    }

    #[tokio::test]
    async fn sign_up_maps_provider_codes() -> Result<()> {
        let (_provider, service) = service();
        service.sign_up("a@x.com", &secret("secret1")).await?;

        assert_eq!(
            service.sign_up("a@x.com", &secret("secret1")).await,
            Err(AuthError::AccountExists)
        );
        assert_eq!(
            service.sign_up("b@x.com", &secret("123")).await,
            Err(AuthError::WeakPassword)
        );

        let disabled = AuthService::new(Arc::new(
            InMemoryIdentityProvider::new().with_registration_disabled(),
        ));
        assert_eq!(
            disabled.sign_up("c@x.com", &secret("secret1")).await,
            Err(AuthError::RegistrationDisabled)
        );
        Ok(())
    }

    #[tokio::test]
    async fn sign_up_checks_confirmation_first() {
        let (provider, service) = service();
        assert_eq!(
            service
                .sign_up_confirmed("a@x.com", &secret("secret1"), &secret("secret2"))
                .await,
            Err(AuthError::InvalidInput(InputProblem::PasswordMismatch))
        );
        assert!(provider.outbox().is_empty());
    }

    #[tokio::test]
    async fn sign_in_unverified_is_refused_and_signed_out() -> Result<()> {
        let provider = Arc::new(
            InMemoryIdentityProvider::new().with_account("a@x.com", "secret1", false),
        );
        let service = AuthService::new(provider.clone());

        assert_eq!(
            service.sign_in("a@x.com", &secret("secret1")).await,
            Err(AuthError::EmailNotVerified)
        );
        assert_eq!(provider.current_identity(), None);
        assert!(!provider.has_staged_session());
        Ok(())
    }

    #[tokio::test]
    async fn sign_in_wrong_password_is_invalid_credentials() {
        let provider =
            Arc::new(InMemoryIdentityProvider::new().with_account("a@x.com", "secret1", true));
        let service = AuthService::new(provider);

        assert_eq!(
            service.sign_in("a@x.com", &secret("nope")).await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            service.sign_in("ghost@x.com", &secret("secret1")).await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn resend_verification_never_makes_session_current() -> Result<()> {
        let provider = Arc::new(
            InMemoryIdentityProvider::new()
                .with_account("a@x.com", "secret1", false)
                .with_account("b@x.com", "secret1", true),
        );
        let service = AuthService::new(provider.clone());

        assert_eq!(
            service
                .resend_verification("a@x.com", &secret("secret1"))
                .await?,
            ResendOutcome::Sent
        );
        assert_eq!(
            service
                .resend_verification("b@x.com", &secret("secret1"))
                .await?,
            ResendOutcome::AlreadyVerified
        );
        assert_eq!(provider.current_identity(), None);
        assert!(!provider.has_staged_session());
        assert_eq!(provider.outbox().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn password_reset_round_trip() -> Result<()> {
        let provider =
            Arc::new(InMemoryIdentityProvider::new().with_account("a@x.com", "secret1", true));
        let service = AuthService::new(provider.clone());

        assert_eq!(
            service.request_password_reset("ghost@x.com").await,
            Err(AuthError::AccountNotFound)
        );
        service.request_password_reset("a@x.com").await?;
        let code = provider
            .last_code("a@x.com")
            .ok_or_else(|| anyhow::anyhow!("no reset code issued"))?;

        assert_eq!(service.verify_reset_code(&code).await?, "a@x.com");
        assert_eq!(
            service
                .confirm_password_reset(&code, &secret("abc"), &secret("abc"))
                .await,
            Err(AuthError::InvalidInput(InputProblem::PasswordTooShort))
        );
        service
            .confirm_password_reset(&code, &secret("newpass1"), &secret("newpass1"))
            .await?;

        assert_eq!(
            service.verify_reset_code(&code).await,
            Err(AuthError::ExpiredOrInvalidResetLink)
        );
        assert_eq!(
            service
                .confirm_password_reset(&code, &secret("newpass2"), &secret("newpass2"))
                .await,
            Err(AuthError::ExpiredOrInvalidResetLink)
        );
        assert_eq!(
            service.sign_in("a@x.com", &secret("newpass1")).await?.email,
            "a@x.com"
        );
        Ok(())
    }

    #[tokio::test]
    async fn verification_code_is_single_use() -> Result<()> {
        let (provider, service) = service();
        service.sign_up("a@x.com", &secret("secret1")).await?;
        let code = provider
            .last_code("a@x.com")
            .ok_or_else(|| anyhow::anyhow!("no verification code issued"))?;

        service.apply_verification_code(&code).await?;
        assert_eq!(
            service.apply_verification_code(&code).await,
            Err(AuthError::ExpiredOrInvalidVerificationLink)
        );
        Ok(())
    }

    #[tokio::test]
    async fn sign_out_clears_session_and_is_repeatable() -> Result<()> {
        let (provider, service) = service();
        service.sign_up("a@x.com", &secret("secret1")).await?;
        assert!(provider.current_identity().is_some());

        service.sign_out().await?;
        assert!(provider.current_identity().is_none());
        service.sign_out().await?;

        provider.set_unavailable(true);
        assert!(matches!(
            service.sign_out().await,
            Err(AuthError::UnknownAuth {
                operation: AuthOperation::SignOut,
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn resend_never_overlaps_a_pending_sign_in() -> Result<()> {
        let provider = Arc::new(
            InMemoryIdentityProvider::new()
                .with_account("a@x.com", "secret1", true)
                .with_account("b@x.com", "secret1", false)
                .with_latency(std::time::Duration::from_millis(30)),
        );
        let service = AuthService::new(provider.clone());
        let password = secret("secret1");

        let (signed_in, resent) = tokio::join!(
            service.sign_in("a@x.com", &password),
            service.resend_verification("b@x.com", &password),
        );
        assert_eq!(signed_in?.email, "a@x.com");
        assert_eq!(
            resent,
            Err(AuthError::AlreadyPending(AuthOperation::SignIn))
        );
        assert_eq!(
            provider.current_identity().map(|identity| identity.email),
            Some("a@x.com".to_string())
        );

        assert_eq!(
            service.resend_verification("b@x.com", &password).await?,
            ResendOutcome::Sent
        );
        Ok(())
    }
}
