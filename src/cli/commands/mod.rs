pub mod account;
pub mod backend;
pub mod logging;
pub mod profile;
pub mod route;

use clap::{
    ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("authgate")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true);

    let command = account::with_subcommands(command);
    let command = profile::with_subcommands(command);
    let command = route::with_subcommands(command);
    let command = backend::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const ENV_VARS: [&str; 10] = [
        "AUTHGATE_BACKEND",
        "AUTHGATE_API_KEY",
        "AUTHGATE_AUTH_URL",
        "AUTHGATE_DATABASE_URL",
        "AUTHGATE_LOCALE",
        "AUTHGATE_LOG_LEVEL",
        "AUTHGATE_EMAIL",
        "AUTHGATE_PASSWORD",
        "AUTHGATE_CONFIRM_PASSWORD",
        "AUTHGATE_NEW_PASSWORD",
    ];

    fn without_env<F: FnOnce()>(f: F) {
        temp_env::with_vars(ENV_VARS.map(|key| (key, None::<String>)), f);
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "authgate");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        for name in [
            account::CMD_SIGNUP,
            account::CMD_LOGIN,
            account::CMD_RESEND_VERIFICATION,
            account::CMD_VERIFY_EMAIL,
            account::CMD_FORGOT_PASSWORD,
            account::CMD_RESET_PASSWORD,
            profile::CMD_PROFILE,
            route::CMD_ROUTE,
        ] {
            assert!(command.find_subcommand(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_login_args() {
        without_env(|| {
            let matches = new().get_matches_from(vec![
                "authgate",
                "--api-key",
                "key-123",
                "login",
                "--email",
                "a@x.com",
                "--password",
                "secret1",
            ]);
            let Some((name, sub)) = matches.subcommand() else {
                panic!("expected a subcommand");
            };
            assert_eq!(name, account::CMD_LOGIN);

            let credentials = account::Credentials::parse(sub).unwrap();
            assert_eq!(credentials.email, "a@x.com");
            assert_eq!(credentials.password.expose_secret(), "secret1");

            let options = backend::Options::parse(&matches).unwrap();
            assert_eq!(options.auth_url, "https://identitytoolkit.googleapis.com");
            assert_eq!(
                options.api_key.map(|key| key.expose_secret().to_string()),
                Some("key-123".to_string())
            );
        });
    }

    #[test]
    fn test_global_args_after_subcommand() {
        without_env(|| {
            let matches = new().get_matches_from(vec![
                "authgate",
                "route",
                "/profile",
                "--backend",
                "memory",
                "--locale",
                "en",
            ]);
            let options = backend::Options::parse(&matches).unwrap();
            assert_eq!(options.backend, crate::cli::globals::Backend::Memory);
            assert_eq!(options.locale, crate::auth::Locale::En);
        });
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("AUTHGATE_API_KEY", Some("key-from-env")),
                ("AUTHGATE_DATABASE_URL", Some("https://demo.firebaseio.com")),
                ("AUTHGATE_LOCALE", Some("en")),
                ("AUTHGATE_EMAIL", Some("a@x.com")),
                ("AUTHGATE_PASSWORD", Some("secret1")),
                ("AUTHGATE_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["authgate", "profile", "show"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );

                let options = backend::Options::parse(&matches).unwrap();
                assert_eq!(
                    options.database_url,
                    Some("https://demo.firebaseio.com".to_string())
                );

                let Some((_, profile)) = matches.subcommand() else {
                    panic!("expected profile subcommand");
                };
                let Some((name, show)) = profile.subcommand() else {
                    panic!("expected show subcommand");
                };
                assert_eq!(name, profile::CMD_SHOW);
                let credentials = account::Credentials::parse(show).unwrap();
                assert_eq!(credentials.email, "a@x.com");
            },
        );
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            without_env(|| {
                let mut args = vec![
                    "authgate".to_string(),
                    "--backend".to_string(),
                    "memory".to_string(),
                    "route".to_string(),
                ];
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_firebase_requires_api_key() {
        without_env(|| {
            let matches = new().get_matches_from(vec!["authgate", "forgot-password", "-e", "a@x.com"]);
            let err = backend::Options::parse(&matches).err().map(|e| e.to_string());
            assert!(err.is_some_and(|e| e.contains("--api-key")));
        });
    }

    #[test]
    fn test_verify_email_requires_link_or_code() {
        without_env(|| {
            let result = new().try_get_matches_from(vec!["authgate", "verify-email"]);
            assert_eq!(
                result.map_err(|e| e.kind()).err(),
                Some(clap::error::ErrorKind::MissingRequiredArgument)
            );

            let result = new().try_get_matches_from(vec![
                "authgate",
                "verify-email",
                "--link",
                "https://x/verify-email?mode=verifyEmail&oobCode=abc",
                "--code",
                "abc",
            ]);
            assert_eq!(
                result.map_err(|e| e.kind()).err(),
                Some(clap::error::ErrorKind::ArgumentConflict)
            );
        });
    }

    #[test]
    fn test_verify_email_code_from_link() {
        without_env(|| {
            let matches = new().get_matches_from(vec![
                "authgate",
                "verify-email",
                "--link",
                "https://x/verify-email?mode=verifyEmail&oobCode=abc",
            ]);
            let Some((_, sub)) = matches.subcommand() else {
                panic!("expected a subcommand");
            };
            let options = account::VerifyEmailOptions::parse(sub).unwrap();
            assert_eq!(options.code, "abc");
        });
    }

    #[test]
    fn test_reset_password_needs_new_password_unless_checking() {
        without_env(|| {
            let matches = new().get_matches_from(vec![
                "authgate",
                "reset-password",
                "--code",
                "abc",
            ]);
            let Some((_, sub)) = matches.subcommand() else {
                panic!("expected a subcommand");
            };
            assert!(account::ResetPasswordOptions::parse(sub).is_err());

            let matches = new().get_matches_from(vec![
                "authgate",
                "reset-password",
                "--code",
                "abc",
                "--check-only",
            ]);
            let Some((_, sub)) = matches.subcommand() else {
                panic!("expected a subcommand");
            };
            let options = account::ResetPasswordOptions::parse(sub).unwrap();
            assert!(options.check_only);
            assert!(options.new_password.is_none());
        });
    }

    #[test]
    fn test_route_credentials_come_in_pairs() {
        without_env(|| {
            let result = new().try_get_matches_from(vec![
                "authgate",
                "route",
                "/profile",
                "--email",
                "a@x.com",
            ]);
            assert_eq!(
                result.map_err(|e| e.kind()).err(),
                Some(clap::error::ErrorKind::MissingRequiredArgument)
            );
        });
    }
}
