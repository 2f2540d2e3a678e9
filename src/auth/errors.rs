//! Closed error taxonomy for user-initiated operations.

use crate::provider::{ProviderError, ProviderErrorCode};
use std::fmt;
use thiserror::Error;

/// Operations a view can trigger; used to attribute errors and pending state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthOperation {
    SignUp,
    SignIn,
    SignOut,
    ResendVerification,
    ApplyVerification,
    RequestPasswordReset,
    VerifyResetCode,
    ConfirmPasswordReset,
}

impl AuthOperation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignUp => "sign-up",
            Self::SignIn => "sign-in",
            Self::SignOut => "sign-out",
            Self::ResendVerification => "resend-verification",
            Self::ApplyVerification => "apply-verification",
            Self::RequestPasswordReset => "request-password-reset",
            Self::VerifyResetCode => "verify-reset-code",
            Self::ConfirmPasswordReset => "confirm-password-reset",
        }
    }
}

impl fmt::Display for AuthOperation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileOperation {
    Load,
    Save,
}

impl fmt::Display for ProfileOperation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Load => "load",
            Self::Save => "save",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Email,
    Password,
    PasswordConfirmation,
    Code,
}

impl fmt::Display for Field {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Email => "email",
            Self::Password => "password",
            Self::PasswordConfirmation => "password confirmation",
            Self::Code => "code",
        })
    }
}

/// Problems caught before the provider is contacted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputProblem {
    MissingField(Field),
    PasswordMismatch,
    PasswordTooShort,
}

impl fmt::Display for InputProblem {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(formatter, "missing {field}"),
            Self::PasswordMismatch => formatter.write_str("passwords do not match"),
            Self::PasswordTooShort => formatter.write_str("password is too short"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(InputProblem),
    #[error("an account with this email already exists")]
    AccountExists,
    #[error("no account found for this email")]
    AccountNotFound,
    #[error("email or password is incorrect")]
    InvalidCredentials,
    #[error("email address has not been verified")]
    EmailNotVerified,
    #[error("invalid email format")]
    InvalidEmailFormat,
    #[error("registration is disabled")]
    RegistrationDisabled,
    #[error("password is too weak")]
    WeakPassword,
    #[error("too many requests")]
    RateLimited,
    #[error("password reset link is expired or invalid")]
    ExpiredOrInvalidResetLink,
    #[error("verification link is expired or invalid")]
    ExpiredOrInvalidVerificationLink,
    #[error("{0} already in progress")]
    AlreadyPending(AuthOperation),
    #[error("{operation} failed: {detail}")]
    UnknownAuth {
        operation: AuthOperation,
        detail: String,
    },
    #[error("profile {operation} failed: {detail}")]
    ProfileIo {
        operation: ProfileOperation,
        detail: String,
    },
}

impl AuthError {
    /// Total mapping from a provider failure to the taxonomy, given the
    /// operation that produced it. Codes without a dedicated member for that
    /// operation become `UnknownAuth`.
    #[must_use]
    pub fn from_provider(operation: AuthOperation, err: &ProviderError) -> Self {
        use AuthOperation as Op;
        use ProviderErrorCode as Code;

        if let ProviderError::Rejected(code) = err {
            let mapped = match (operation, code) {
                (Op::SignUp, Code::EmailAlreadyInUse) => Some(Self::AccountExists),
                (Op::SignUp | Op::RequestPasswordReset, Code::InvalidEmail) => {
                    Some(Self::InvalidEmailFormat)
                }
                (Op::SignUp, Code::OperationNotAllowed) => Some(Self::RegistrationDisabled),
                (Op::SignUp | Op::ConfirmPasswordReset, Code::WeakPassword) => {
                    Some(Self::WeakPassword)
                }
                (Op::SignIn | Op::ResendVerification, Code::InvalidCredential | Code::UserNotFound) => {
                    Some(Self::InvalidCredentials)
                }
                (Op::RequestPasswordReset, Code::UserNotFound) => Some(Self::AccountNotFound),
                (Op::RequestPasswordReset | Op::ResendVerification, Code::TooManyRequests) => {
                    Some(Self::RateLimited)
                }
                (Op::VerifyResetCode, _)
                | (Op::ConfirmPasswordReset, Code::ExpiredActionCode | Code::InvalidActionCode) => {
                    Some(Self::ExpiredOrInvalidResetLink)
                }
                (Op::ApplyVerification, Code::ExpiredActionCode | Code::InvalidActionCode) => {
                    Some(Self::ExpiredOrInvalidVerificationLink)
                }
                _ => None,
            };
            if let Some(mapped) = mapped {
                return mapped;
            }
        }

        Self::UnknownAuth {
            operation,
            detail: err.to_string(),
        }
    }

    #[must_use]
    pub fn profile_io(operation: ProfileOperation, err: &impl fmt::Display) -> Self {
        Self::ProfileIo {
            operation,
            detail: err.to_string(),
        }
    }

    /// Whether the user can sensibly try the same action again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited
                | Self::AlreadyPending(_)
                | Self::UnknownAuth { .. }
                | Self::ProfileIo { .. }
        )
    }
}
