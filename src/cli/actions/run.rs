use crate::cli::{
    actions::{Action, account, profile, route},
    telemetry,
};
use anyhow::Result;

/// Execute the provided action.
// This is the single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    let result = match action {
        Action::SignUp(args) => account::sign_up(args).await,
        Action::SignIn(args) => account::sign_in(args).await,
        Action::ResendVerification(args) => account::resend_verification(args).await,
        Action::VerifyEmail(args) => account::verify_email(args).await,
        Action::ForgotPassword(args) => account::forgot_password(args).await,
        Action::ResetPassword(args) => account::reset_password(args).await,
        Action::ProfileShow(args) => profile::show(args).await,
        Action::ProfileUpdate(args) => profile::update(args).await,
        Action::Route(args) => route::execute(args).await,
    };

    telemetry::shutdown_tracer();
    result
}
