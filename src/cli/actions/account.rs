use crate::{
    auth::{Notice, ResendOutcome},
    cli::{
        actions::portal::Portal,
        commands::account::{
            Credentials, ForgotPasswordOptions, ResetPasswordOptions, SignUpOptions,
            VerifyEmailOptions,
        },
        globals::GlobalArgs,
    },
    gate::{self, GateDecision, SIGN_IN_PATH, VERIFY_EMAIL_PATH},
};
use anyhow::{Result, bail};

#[derive(Debug)]
pub struct SignUpArgs {
    pub globals: GlobalArgs,
    pub options: SignUpOptions,
}

#[derive(Debug)]
pub struct CredentialArgs {
    pub globals: GlobalArgs,
    pub credentials: Credentials,
}

#[derive(Debug)]
pub struct VerifyEmailArgs {
    pub globals: GlobalArgs,
    pub options: VerifyEmailOptions,
}

#[derive(Debug)]
pub struct ForgotPasswordArgs {
    pub globals: GlobalArgs,
    pub options: ForgotPasswordOptions,
}

#[derive(Debug)]
pub struct ResetPasswordArgs {
    pub globals: GlobalArgs,
    pub options: ResetPasswordOptions,
}

/// Create the account, seed its profile and point the user at the
/// verification page.
///
/// # Errors
/// Returns the localized failure of the sign-up.
pub async fn sign_up(args: SignUpArgs) -> Result<()> {
    let portal = Portal::open(&args.globals).await?;
    let result = sign_up_flow(&portal, &args.options).await;
    portal.close().await;
    result
}

async fn sign_up_flow(portal: &Portal, options: &SignUpOptions) -> Result<()> {
    let Credentials { email, password } = &options.credentials;
    let outcome = match &options.confirmation {
        Some(confirmation) => {
            portal
                .auth
                .sign_up_confirmed(email, password, confirmation)
                .await
        }
        None => portal.auth.sign_up(email, password).await,
    }
    .map_err(|err| portal.user_error(&err))?;

    portal.await_identity(&outcome.identity).await?;
    if let Ok(profiles) = portal.profiles() {
        profiles.seed(&outcome.identity).await;
    }

    println!(
        "{}",
        Notice::VerificationSent {
            email: outcome.identity.email.clone(),
        }
        .localized(portal.locale())
    );

    // An unverified session may only stay on the verification page.
    match portal.navigate(VERIFY_EMAIL_PATH) {
        GateDecision::Render(route) => println!("{}", route.path()),
        decision => println!("{}", decision.redirect_target().unwrap_or(SIGN_IN_PATH)),
    }
    Ok(())
}

/// # Errors
/// Returns the localized failure of the sign-in.
pub async fn sign_in(args: CredentialArgs) -> Result<()> {
    let portal = Portal::open(&args.globals).await?;
    let result = sign_in_flow(&portal, &args.credentials).await;
    portal.close().await;
    result
}

async fn sign_in_flow(portal: &Portal, credentials: &Credentials) -> Result<()> {
    let identity = portal
        .sign_in(&credentials.email, &credentials.password)
        .await?;
    println!(
        "{}",
        Notice::SignedIn {
            email: identity.email,
        }
        .localized(portal.locale())
    );

    // The sign-in page bounces a verified session to where it was headed.
    let next = match portal.navigate(SIGN_IN_PATH) {
        GateDecision::RedirectToHome => gate::resume_path(None),
        _ => SIGN_IN_PATH.to_string(),
    };
    println!("{next}");
    Ok(())
}

/// # Errors
/// Returns the localized failure of the resend.
pub async fn resend_verification(args: CredentialArgs) -> Result<()> {
    let portal = Portal::open(&args.globals).await?;
    let result = resend_flow(&portal, &args.credentials).await;
    portal.close().await;
    result
}

async fn resend_flow(portal: &Portal, credentials: &Credentials) -> Result<()> {
    let outcome = portal
        .auth
        .resend_verification(&credentials.email, &credentials.password)
        .await
        .map_err(|err| portal.user_error(&err))?;
    let notice = match outcome {
        ResendOutcome::Sent => Notice::VerificationResent,
        ResendOutcome::AlreadyVerified => Notice::AlreadyVerified,
    };
    println!("{}", notice.localized(portal.locale()));
    Ok(())
}

/// # Errors
/// Returns the localized failure of the verification.
pub async fn verify_email(args: VerifyEmailArgs) -> Result<()> {
    let portal = Portal::open(&args.globals).await?;
    let result = portal
        .auth
        .apply_verification_code(&args.options.code)
        .await
        .map_err(|err| portal.user_error(&err));
    if result.is_ok() {
        println!("{}", Notice::EmailVerified.localized(portal.locale()));
        println!("{SIGN_IN_PATH}");
    }
    portal.close().await;
    result
}

/// # Errors
/// Returns the localized failure of the reset request.
pub async fn forgot_password(args: ForgotPasswordArgs) -> Result<()> {
    let portal = Portal::open(&args.globals).await?;
    let result = portal
        .auth
        .request_password_reset(&args.options.email)
        .await
        .map_err(|err| portal.user_error(&err));
    if result.is_ok() {
        println!("{}", Notice::PasswordResetSent.localized(portal.locale()));
    }
    portal.close().await;
    result
}

/// Check the reset code and, unless only checking, set the new password.
///
/// # Errors
/// Returns the localized failure of the code check or the reset.
pub async fn reset_password(args: ResetPasswordArgs) -> Result<()> {
    let portal = Portal::open(&args.globals).await?;
    let result = reset_flow(&portal, &args.options).await;
    portal.close().await;
    result
}

async fn reset_flow(portal: &Portal, options: &ResetPasswordOptions) -> Result<()> {
    let email = portal
        .auth
        .verify_reset_code(&options.code)
        .await
        .map_err(|err| portal.user_error(&err))?;
    println!(
        "{}",
        Notice::ResetCodeValid { email }.localized(portal.locale())
    );
    if options.check_only {
        return Ok(());
    }

    let Some(new_password) = &options.new_password else {
        bail!("missing required argument: --new-password");
    };
    let confirmation = options.confirmation.as_ref().unwrap_or(new_password);
    portal
        .auth
        .confirm_password_reset(&options.code, new_password, confirmation)
        .await
        .map_err(|err| portal.user_error(&err))?;
    println!(
        "{}",
        Notice::PasswordResetComplete.localized(portal.locale())
    );
    println!("{SIGN_IN_PATH}");
    Ok(())
}
