use crate::{
    cli::{actions::portal::Portal, commands::route::Options, globals::GlobalArgs},
    gate::{self, GateDecision},
};
use anyhow::Result;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub options: Options,
}

/// Show what the gate decides for a path, optionally after signing in.
///
/// A failed sign-in is reported and the path is then evaluated signed out.
///
/// # Errors
/// Returns an error if the backend cannot be opened.
pub async fn execute(args: Args) -> Result<()> {
    let portal = Portal::open(&args.globals).await?;

    if let Some(credentials) = &args.options.credentials
        && let Err(err) = portal
            .sign_in(&credentials.email, &credentials.password)
            .await
    {
        eprintln!("{err}");
    }

    let path = args.options.path.as_str();
    let snapshot = portal.snapshot();
    let decision = portal.navigate(path);
    info!(path, ?decision, "route evaluated");

    match &decision {
        GateDecision::Suspend => println!("suspend"),
        GateDecision::Render(route) => println!("render {}", route.path()),
        GateDecision::RedirectToSignIn { return_to } => {
            println!("redirect {} (return to {return_to})", gate::SIGN_IN_PATH);
            println!("after sign-in: {}", gate::resume_path(Some(return_to)));
        }
        GateDecision::RedirectToHome => println!("redirect {}", gate::HOME_PATH),
    }
    println!(
        "navigation: {}",
        if gate::shows_navigation(&snapshot, path) {
            "shown"
        } else {
            "hidden"
        }
    );

    portal.close().await;
    Ok(())
}
