pub mod account;
pub mod portal;
pub mod profile;
pub mod route;

// Internal "interpreter" for `Action`.
mod run;

#[derive(Debug)]
pub enum Action {
    SignUp(account::SignUpArgs),
    SignIn(account::CredentialArgs),
    ResendVerification(account::CredentialArgs),
    VerifyEmail(account::VerifyEmailArgs),
    ForgotPassword(account::ForgotPasswordArgs),
    ResetPassword(account::ResetPasswordArgs),
    ProfileShow(profile::ShowArgs),
    ProfileUpdate(profile::UpdateArgs),
    Route(route::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
