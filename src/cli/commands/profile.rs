use super::account::{Credentials, email_arg, password_arg};
use clap::{Arg, ArgMatches, Command};

pub const CMD_PROFILE: &str = "profile";
pub const CMD_SHOW: &str = "show";
pub const CMD_UPDATE: &str = "update";

pub const ARG_DISPLAY_NAME: &str = "display-name";
pub const ARG_PHONE_NUMBER: &str = "phone-number";
pub const ARG_ADDRESS: &str = "address";

/// Field overrides for `profile update`; unset fields keep their stored value.
#[derive(Clone, Debug)]
pub struct UpdateOptions {
    pub credentials: Credentials,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl UpdateOptions {
    /// # Errors
    /// Returns an error if the credentials are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        Ok(Self {
            credentials: Credentials::parse(matches)?,
            display_name: matches.get_one::<String>(ARG_DISPLAY_NAME).cloned(),
            phone_number: matches.get_one::<String>(ARG_PHONE_NUMBER).cloned(),
            address: matches.get_one::<String>(ARG_ADDRESS).cloned(),
        })
    }
}

#[must_use]
pub fn with_subcommands(command: Command) -> Command {
    command.subcommand(
        Command::new(CMD_PROFILE)
            .about("Show or edit the signed-in account's profile")
            .subcommand_required(true)
            .arg_required_else_help(true)
            .subcommand(
                Command::new(CMD_SHOW)
                    .about("Print the profile, creating it on first access")
                    .arg(email_arg().required(true))
                    .arg(password_arg().required(true)),
            )
            .subcommand(
                Command::new(CMD_UPDATE)
                    .about("Update profile fields")
                    .arg(email_arg().required(true))
                    .arg(password_arg().required(true))
                    .arg(
                        Arg::new(ARG_DISPLAY_NAME)
                            .long(ARG_DISPLAY_NAME)
                            .help("Display name"),
                    )
                    .arg(
                        Arg::new(ARG_PHONE_NUMBER)
                            .long(ARG_PHONE_NUMBER)
                            .help("Phone number"),
                    )
                    .arg(Arg::new(ARG_ADDRESS).long(ARG_ADDRESS).help("Address")),
            ),
    )
}
