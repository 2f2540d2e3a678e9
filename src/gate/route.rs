//! Known navigable paths and their public/protected partition.

pub const HOME_PATH: &str = "/";
pub const SIGN_IN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const VERIFY_EMAIL_PATH: &str = "/verify-email";
pub const FORGOT_PASSWORD_PATH: &str = "/forgot-password";
pub const RESET_PASSWORD_PATH: &str = "/reset-password";
pub const PROFILE_PATH: &str = "/profile";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    SignIn,
    Register,
    VerifyEmail,
    ForgotPassword,
    ResetPassword,
    Profile,
    /// Any path the application does not know; treated as protected.
    Other(String),
}

impl Route {
    /// Classify a requested path. Query strings, fragments and a trailing
    /// slash are ignored.
    #[must_use]
    pub fn parse(requested_path: &str) -> Self {
        let path = strip_path(requested_path);

        match path {
            HOME_PATH => Self::Home,
            SIGN_IN_PATH => Self::SignIn,
            REGISTER_PATH => Self::Register,
            VERIFY_EMAIL_PATH => Self::VerifyEmail,
            FORGOT_PASSWORD_PATH => Self::ForgotPassword,
            RESET_PASSWORD_PATH => Self::ResetPassword,
            PROFILE_PATH => Self::Profile,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Home => HOME_PATH,
            Self::SignIn => SIGN_IN_PATH,
            Self::Register => REGISTER_PATH,
            Self::VerifyEmail => VERIFY_EMAIL_PATH,
            Self::ForgotPassword => FORGOT_PASSWORD_PATH,
            Self::ResetPassword => RESET_PASSWORD_PATH,
            Self::Profile => PROFILE_PATH,
            Self::Other(path) => path,
        }
    }

    /// Reachable without a verified session.
    #[must_use]
    pub const fn is_public(&self) -> bool {
        matches!(
            self,
            Self::SignIn
                | Self::Register
                | Self::VerifyEmail
                | Self::ForgotPassword
                | Self::ResetPassword
        )
    }

    /// Pages that only make sense before signing in.
    #[must_use]
    pub const fn is_credential_entry(&self) -> bool {
        matches!(self, Self::SignIn | Self::Register)
    }
}

fn strip_path(requested_path: &str) -> &str {
    let path = requested_path.trim();
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    if path.is_empty() { HOME_PATH } else { path }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_paths() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/login"), Route::SignIn);
        assert_eq!(Route::parse("/register/"), Route::Register);
        assert_eq!(
            Route::parse("/verify-email?mode=verifyEmail&oobCode=abc"),
            Route::VerifyEmail
        );
        assert_eq!(Route::parse("/reset-password#top"), Route::ResetPassword);
        assert_eq!(Route::parse("/profile"), Route::Profile);
    }

    #[test]
    fn unknown_paths_are_protected() {
        let route = Route::parse("/admin/users?page=2");
        assert_eq!(route, Route::Other("/admin/users".to_string()));
        assert!(!route.is_public());
        assert_eq!(route.path(), "/admin/users");
    }

    #[test]
    fn public_set_matches_credential_flows() {
        for path in [
            SIGN_IN_PATH,
            REGISTER_PATH,
            VERIFY_EMAIL_PATH,
            FORGOT_PASSWORD_PATH,
            RESET_PASSWORD_PATH,
        ] {
            assert!(Route::parse(path).is_public(), "{path} should be public");
        }
        assert!(!Route::Home.is_public());
        assert!(!Route::Profile.is_public());
        assert!(Route::SignIn.is_credential_entry());
        assert!(Route::Register.is_credential_entry());
        assert!(!Route::VerifyEmail.is_credential_entry());
    }
}
