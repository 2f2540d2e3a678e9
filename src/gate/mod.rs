//! Route access gate: maps the latest session snapshot and a requested path to
//! a render or redirect decision.
//!
//! The gate keeps no state of its own. Evaluating the same snapshot and path
//! twice always yields the same decision. Unknown paths require a verified
//! session.

mod route;

pub use route::{
    FORGOT_PASSWORD_PATH, HOME_PATH, PROFILE_PATH, REGISTER_PATH, RESET_PASSWORD_PATH,
    Route, SIGN_IN_PATH, VERIFY_EMAIL_PATH,
};

use crate::session::SessionSnapshot;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// Session not resolved yet; render nothing and decide later.
    Suspend,
    Render(Route),
    /// Send the user to sign-in and bring them back to `return_to` afterwards.
    RedirectToSignIn { return_to: String },
    RedirectToHome,
}

impl GateDecision {
    /// Path to navigate to, if the decision is a redirect.
    #[must_use]
    pub const fn redirect_target(&self) -> Option<&'static str> {
        match self {
            Self::RedirectToSignIn { .. } => Some(SIGN_IN_PATH),
            Self::RedirectToHome => Some(HOME_PATH),
            Self::Suspend | Self::Render(_) => None,
        }
    }
}

/// Decide what to show for `requested_path` given `snapshot`.
#[must_use]
pub fn evaluate(snapshot: &SessionSnapshot, requested_path: &str) -> GateDecision {
    if snapshot.is_initializing() {
        return GateDecision::Suspend;
    }

    let route = Route::parse(requested_path);
    let verified = snapshot.is_verified();

    if route.is_public() {
        if verified && route.is_credential_entry() {
            GateDecision::RedirectToHome
        } else {
            GateDecision::Render(route)
        }
    } else if verified {
        GateDecision::Render(route)
    } else {
        GateDecision::RedirectToSignIn {
            return_to: return_path(requested_path),
        }
    }
}

/// Where to go after a successful sign-in. Only same-origin protected paths
/// are honoured; anything else falls back to home.
#[must_use]
pub fn resume_path(return_to: Option<&str>) -> String {
    return_to
        .map(str::trim)
        .filter(|path| path.starts_with('/') && !path.starts_with("//"))
        .filter(|path| !Route::parse(path).is_public())
        .map_or_else(|| HOME_PATH.to_string(), ToString::to_string)
}

/// Whether the signed-in navigation bar is shown on `requested_path`.
#[must_use]
pub fn shows_navigation(snapshot: &SessionSnapshot, requested_path: &str) -> bool {
    snapshot.is_signed_in() && !Route::parse(requested_path).is_public()
}

fn return_path(requested_path: &str) -> String {
    let trimmed = requested_path.trim();
    if trimmed.is_empty() {
        HOME_PATH.to_string()
    } else {
        trimmed.to_string()
    }
}
