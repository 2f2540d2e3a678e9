use crate::{
    auth::Notice,
    cli::{
        actions::portal::Portal,
        commands::{account::Credentials, profile::UpdateOptions},
        globals::GlobalArgs,
    },
    gate::{GateDecision, PROFILE_PATH},
    profile::{ProfileDraft, ProfileRecord},
    session::Identity,
};
use anyhow::{Context, Result, bail};

#[derive(Debug)]
pub struct ShowArgs {
    pub globals: GlobalArgs,
    pub credentials: Credentials,
}

#[derive(Debug)]
pub struct UpdateArgs {
    pub globals: GlobalArgs,
    pub options: UpdateOptions,
}

/// # Errors
/// Returns an error if sign-in fails, the profile page is not reachable or the
/// record cannot be loaded.
pub async fn show(args: ShowArgs) -> Result<()> {
    let portal = Portal::open(&args.globals).await?;
    let result = show_flow(&portal, &args.credentials).await;
    portal.close().await;
    result
}

async fn show_flow(portal: &Portal, credentials: &Credentials) -> Result<()> {
    let identity = enter_profile_page(portal, credentials).await?;
    let record = load(portal, &identity).await?;
    print_record(&record)
}

/// # Errors
/// Returns an error if sign-in fails, the profile page is not reachable or the
/// record cannot be saved.
pub async fn update(args: UpdateArgs) -> Result<()> {
    let portal = Portal::open(&args.globals).await?;
    let result = update_flow(&portal, &args.options).await;
    portal.close().await;
    result
}

async fn update_flow(portal: &Portal, options: &UpdateOptions) -> Result<()> {
    let identity = enter_profile_page(portal, &options.credentials).await?;
    let current = load(portal, &identity).await?;

    let mut draft = ProfileDraft::from_record(&current);
    if let Some(display_name) = &options.display_name {
        draft = draft.with_display_name(display_name);
    }
    if let Some(phone_number) = &options.phone_number {
        draft = draft.with_phone_number(phone_number);
    }
    if let Some(address) = &options.address {
        draft = draft.with_address(address);
    }

    let saved = portal
        .profiles()?
        .save(&identity, &draft)
        .await
        .map_err(|err| portal.user_error(&err))?;
    println!("{}", Notice::ProfileSaved.localized(portal.locale()));
    print_record(&saved)
}

async fn enter_profile_page(portal: &Portal, credentials: &Credentials) -> Result<Identity> {
    // Fail on a missing database before touching the account.
    portal.profiles()?;
    let identity = portal
        .sign_in(&credentials.email, &credentials.password)
        .await?;
    match portal.navigate(PROFILE_PATH) {
        GateDecision::Render(_) => Ok(identity),
        decision => bail!("profile page not reachable: {decision:?}"),
    }
}

async fn load(portal: &Portal, identity: &Identity) -> Result<ProfileRecord> {
    portal
        .profiles()?
        .load(identity)
        .await
        .map_err(|err| portal.user_error(&err))
}

fn print_record(record: &ProfileRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record).context("failed to render profile")?;
    println!("{json}");
    Ok(())
}
