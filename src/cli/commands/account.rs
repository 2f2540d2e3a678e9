use crate::auth::ActionLink;
use anyhow::Context;
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use secrecy::SecretString;

pub const CMD_SIGNUP: &str = "signup";
pub const CMD_LOGIN: &str = "login";
pub const CMD_RESEND_VERIFICATION: &str = "resend-verification";
pub const CMD_VERIFY_EMAIL: &str = "verify-email";
pub const CMD_FORGOT_PASSWORD: &str = "forgot-password";
pub const CMD_RESET_PASSWORD: &str = "reset-password";

pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_CONFIRM_PASSWORD: &str = "confirm-password";
pub const ARG_NEW_PASSWORD: &str = "new-password";
pub const ARG_LINK: &str = "link";
pub const ARG_CODE: &str = "code";
pub const ARG_CHECK_ONLY: &str = "check-only";

/// Email and password of an existing (or new) account.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    /// # Errors
    /// Returns an error if the email or password is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let email = matches
            .get_one::<String>(ARG_EMAIL)
            .cloned()
            .context("missing required argument: --email")?;
        let password = secret(matches, ARG_PASSWORD)
            .context("missing required argument: --password")?;
        Ok(Self { email, password })
    }

    /// Both or neither must be given.
    ///
    /// # Errors
    /// Returns an error if only one of email and password is present.
    pub fn parse_optional(matches: &ArgMatches) -> anyhow::Result<Option<Self>> {
        if matches.get_one::<String>(ARG_EMAIL).is_none()
            && matches.get_one::<String>(ARG_PASSWORD).is_none()
        {
            return Ok(None);
        }
        Self::parse(matches).map(Some)
    }
}

#[derive(Clone, Debug)]
pub struct SignUpOptions {
    pub credentials: Credentials,
    pub confirmation: Option<SecretString>,
}

impl SignUpOptions {
    /// # Errors
    /// Returns an error if the email or password is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        Ok(Self {
            credentials: Credentials::parse(matches)?,
            confirmation: secret(matches, ARG_CONFIRM_PASSWORD),
        })
    }
}

#[derive(Clone, Debug)]
pub struct ForgotPasswordOptions {
    pub email: String,
}

impl ForgotPasswordOptions {
    /// # Errors
    /// Returns an error if the email is missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let email = matches
            .get_one::<String>(ARG_EMAIL)
            .cloned()
            .context("missing required argument: --email")?;
        Ok(Self { email })
    }
}

#[derive(Clone, Debug)]
pub struct VerifyEmailOptions {
    pub code: String,
}

impl VerifyEmailOptions {
    /// # Errors
    /// Returns an error if neither a link with an `oobCode` nor a code is given.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        Ok(Self {
            code: action_code(matches)?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct ResetPasswordOptions {
    pub code: String,
    pub new_password: Option<SecretString>,
    pub confirmation: Option<SecretString>,
    pub check_only: bool,
}

impl ResetPasswordOptions {
    /// # Errors
    /// Returns an error if the code is missing, or the new password is
    /// missing when not only checking the link.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let check_only = matches.get_flag(ARG_CHECK_ONLY);
        let new_password = secret(matches, ARG_NEW_PASSWORD);
        if !check_only && new_password.is_none() {
            anyhow::bail!("missing required argument: --{ARG_NEW_PASSWORD}");
        }
        Ok(Self {
            code: action_code(matches)?,
            new_password,
            confirmation: secret(matches, ARG_CONFIRM_PASSWORD),
            check_only,
        })
    }
}

fn secret(matches: &ArgMatches, id: &str) -> Option<SecretString> {
    matches
        .get_one::<String>(id)
        .cloned()
        .map(SecretString::from)
}

fn action_code(matches: &ArgMatches) -> anyhow::Result<String> {
    if let Some(code) = matches.get_one::<String>(ARG_CODE) {
        return Ok(code.clone());
    }
    let link = matches
        .get_one::<String>(ARG_LINK)
        .context("missing required argument: --link or --code")?;
    ActionLink::parse(link)
        .map(|link| link.code)
        .context("link does not contain an oobCode parameter")
}

pub(super) fn email_arg() -> Arg {
    Arg::new(ARG_EMAIL)
        .short('e')
        .long(ARG_EMAIL)
        .help("Account email")
        .env("AUTHGATE_EMAIL")
}

pub(super) fn password_arg() -> Arg {
    Arg::new(ARG_PASSWORD)
        .short('p')
        .long(ARG_PASSWORD)
        .help("Account password")
        .env("AUTHGATE_PASSWORD")
        .hide_env_values(true)
}

fn confirm_password_arg() -> Arg {
    Arg::new(ARG_CONFIRM_PASSWORD)
        .long(ARG_CONFIRM_PASSWORD)
        .help("Repeat the password")
        .env("AUTHGATE_CONFIRM_PASSWORD")
        .hide_env_values(true)
}

fn action_code_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LINK)
                .long(ARG_LINK)
                .help("Link from the email (its oobCode is used)"),
        )
        .arg(
            Arg::new(ARG_CODE)
                .long(ARG_CODE)
                .help("The oobCode from the email link"),
        )
        .group(
            ArgGroup::new("action-code")
                .args([ARG_LINK, ARG_CODE])
                .required(true),
        )
}

#[must_use]
pub fn with_subcommands(command: Command) -> Command {
    command
        .subcommand(
            Command::new(CMD_SIGNUP)
                .about("Create an account and send the verification email")
                .arg(email_arg().required(true))
                .arg(password_arg().required(true))
                .arg(confirm_password_arg()),
        )
        .subcommand(
            Command::new(CMD_LOGIN)
                .about("Sign in with a verified account")
                .arg(email_arg().required(true))
                .arg(password_arg().required(true)),
        )
        .subcommand(
            Command::new(CMD_RESEND_VERIFICATION)
                .about("Send the verification email again")
                .arg(email_arg().required(true))
                .arg(password_arg().required(true)),
        )
        .subcommand(action_code_args(
            Command::new(CMD_VERIFY_EMAIL).about("Complete email verification from the emailed link"),
        ))
        .subcommand(
            Command::new(CMD_FORGOT_PASSWORD)
                .about("Email a password reset link")
                .arg(email_arg().required(true)),
        )
        .subcommand(
            action_code_args(
                Command::new(CMD_RESET_PASSWORD).about("Choose a new password from the emailed link"),
            )
            .arg(
                Arg::new(ARG_NEW_PASSWORD)
                    .long(ARG_NEW_PASSWORD)
                    .help("New password (at least 6 characters)")
                    .env("AUTHGATE_NEW_PASSWORD")
                    .hide_env_values(true),
            )
            .arg(confirm_password_arg())
            .arg(
                Arg::new(ARG_CHECK_ONLY)
                    .long(ARG_CHECK_ONLY)
                    .help("Only check that the link is still valid")
                    .action(ArgAction::SetTrue),
            ),
        )
}
