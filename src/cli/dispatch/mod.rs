//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the `Action` for the selected subcommand,
//! with the shared backend settings resolved into `GlobalArgs`.

use crate::cli::actions::{Action, account, profile, route};
use crate::cli::commands::{account as account_cmd, backend, profile as profile_cmd, route as route_cmd};
use anyhow::{Result, bail};

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let globals = backend::Options::parse(matches)?.into_globals();

    let Some((name, sub)) = matches.subcommand() else {
        bail!("missing command");
    };

    let action = match name {
        account_cmd::CMD_SIGNUP => Action::SignUp(account::SignUpArgs {
            globals,
            options: account_cmd::SignUpOptions::parse(sub)?,
        }),
        account_cmd::CMD_LOGIN => Action::SignIn(account::CredentialArgs {
            globals,
            credentials: account_cmd::Credentials::parse(sub)?,
        }),
        account_cmd::CMD_RESEND_VERIFICATION => {
            Action::ResendVerification(account::CredentialArgs {
                globals,
                credentials: account_cmd::Credentials::parse(sub)?,
            })
        }
        account_cmd::CMD_VERIFY_EMAIL => Action::VerifyEmail(account::VerifyEmailArgs {
            globals,
            options: account_cmd::VerifyEmailOptions::parse(sub)?,
        }),
        account_cmd::CMD_FORGOT_PASSWORD => {
            Action::ForgotPassword(account::ForgotPasswordArgs {
                globals,
                options: account_cmd::ForgotPasswordOptions::parse(sub)?,
            })
        }
        account_cmd::CMD_RESET_PASSWORD => Action::ResetPassword(account::ResetPasswordArgs {
            globals,
            options: account_cmd::ResetPasswordOptions::parse(sub)?,
        }),
        profile_cmd::CMD_PROFILE => match sub.subcommand() {
            Some((profile_cmd::CMD_SHOW, show)) => Action::ProfileShow(profile::ShowArgs {
                globals,
                credentials: account_cmd::Credentials::parse(show)?,
            }),
            Some((profile_cmd::CMD_UPDATE, update)) => {
                Action::ProfileUpdate(profile::UpdateArgs {
                    globals,
                    options: profile_cmd::UpdateOptions::parse(update)?,
                })
            }
            _ => bail!("missing profile command: show or update"),
        },
        route_cmd::CMD_ROUTE => Action::Route(route::Args {
            globals,
            options: route_cmd::Options::parse(sub)?,
        }),
        other => bail!("unknown command: {other}"),
    };

    Ok(action)
}
