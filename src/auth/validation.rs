//! Client-side input checks run before any provider call.

use super::errors::{AuthError, Field, InputProblem};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

/// Minimum password length enforced when choosing a new password.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Normalize an email for provider calls.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Present and plausibly formatted; returns the normalized address.
///
/// # Errors
/// `InvalidInput` when empty, `InvalidEmailFormat` when malformed.
pub fn require_email(email: &str) -> Result<String, AuthError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AuthError::InvalidInput(InputProblem::MissingField(
            Field::Email,
        )));
    }
    if !valid_email(&email) {
        return Err(AuthError::InvalidEmailFormat);
    }
    Ok(email)
}

/// # Errors
/// `InvalidInput` when the password is empty.
pub fn require_password(password: &SecretString) -> Result<(), AuthError> {
    if password.expose_secret().is_empty() {
        return Err(AuthError::InvalidInput(InputProblem::MissingField(
            Field::Password,
        )));
    }
    Ok(())
}

/// # Errors
/// `InvalidInput` when the confirmation is empty or differs.
pub fn require_confirmation(
    password: &SecretString,
    confirmation: &SecretString,
) -> Result<(), AuthError> {
    if confirmation.expose_secret().is_empty() {
        return Err(AuthError::InvalidInput(InputProblem::MissingField(
            Field::PasswordConfirmation,
        )));
    }
    if password.expose_secret() != confirmation.expose_secret() {
        return Err(AuthError::InvalidInput(InputProblem::PasswordMismatch));
    }
    Ok(())
}

/// Checks for a password being chosen during reset.
///
/// # Errors
/// `InvalidInput` on mismatch or when shorter than [`MIN_PASSWORD_LEN`].
pub fn require_new_password(
    password: &SecretString,
    confirmation: &SecretString,
) -> Result<(), AuthError> {
    require_password(password)?;
    require_confirmation(password, confirmation)?;
    if password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::InvalidInput(InputProblem::PasswordTooShort));
    }
    Ok(())
}

/// # Errors
/// `InvalidInput` when the code is blank.
pub fn require_code(code: &str) -> Result<&str, AuthError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AuthError::InvalidInput(InputProblem::MissingField(
            Field::Code,
        )));
    }
    Ok(code)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionMode {
    VerifyEmail,
    ResetPassword,
}

/// The `mode` and `oobCode` carried by an emailed action link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionLink {
    pub mode: Option<ActionMode>,
    pub code: String,
}

impl ActionLink {
    /// Accepts a full URL, a path with a query, or a bare query string.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let query = match Url::parse(input) {
            Ok(url) => url.query().map(ToString::to_string),
            Err(_) => Some(
                input
                    .split_once('?')
                    .map_or(input, |(_, query)| query)
                    .split('#')
                    .next()
                    .unwrap_or_default()
                    .to_string(),
            ),
        }?;

        let mut mode = None;
        let mut code = None;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "mode" => {
                    mode = match value.as_ref() {
                        "verifyEmail" => Some(ActionMode::VerifyEmail),
                        "resetPassword" => Some(ActionMode::ResetPassword),
                        _ => None,
                    };
                }
                "oobCode" if !value.trim().is_empty() => code = Some(value.trim().to_string()),
                _ => {}
            }
        }

        code.map(|code| Self { mode, code })
    }
}
