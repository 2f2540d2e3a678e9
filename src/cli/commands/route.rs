use super::account::{ARG_EMAIL, ARG_PASSWORD, Credentials, email_arg, password_arg};
use clap::{Arg, ArgMatches, Command};

pub const CMD_ROUTE: &str = "route";
pub const ARG_PATH: &str = "path";

#[derive(Clone, Debug)]
pub struct Options {
    pub path: String,
    pub credentials: Option<Credentials>,
}

impl Options {
    /// # Errors
    /// Returns an error if only one of email and password is given.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        Ok(Self {
            path: matches
                .get_one::<String>(ARG_PATH)
                .cloned()
                .unwrap_or_else(|| "/".to_string()),
            credentials: Credentials::parse_optional(matches)?,
        })
    }
}

#[must_use]
pub fn with_subcommands(command: Command) -> Command {
    command.subcommand(
        Command::new(CMD_ROUTE)
            .about("Show what the portal would do when navigating to a path")
            .long_about(
                "Show what the portal would do when navigating to a path. With --email and --password the decision is made after signing in.",
            )
            .arg(
                Arg::new(ARG_PATH)
                    .help("Requested path, e.g. /profile")
                    .default_value("/"),
            )
            .arg(email_arg().requires(ARG_PASSWORD))
            .arg(password_arg().requires(ARG_EMAIL)),
    )
}
