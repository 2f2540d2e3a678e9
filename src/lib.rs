//! # authgate (account portal client)
//!
//! `authgate` drives user registration, sign-in, email verification, password
//! reset and profile editing against a managed identity backend. Durable state,
//! credential checks and token issuance all live in that backend; this crate
//! owns the client-side session state and the routing rules built on it.
//!
//! ## Session flow
//!
//! The identity provider pushes `Option<Identity>` events over a channel. The
//! [`session::SessionHolder`] is the only consumer and publishes immutable
//! snapshots. The [`gate`] reads the latest snapshot on every navigation and
//! decides whether to render, redirect to sign-in (remembering where the user
//! was going) or redirect home.
//!
//! ## Verified sessions only
//!
//! Sign-in is two-phase: credentials are checked first and the session is only
//! made current once the account's email is verified. An unverified account is
//! never published as the current identity by a sign-in, not even briefly.
//!
//! ## Errors
//!
//! Every provider failure is mapped at the operation boundary onto the closed
//! [`auth::AuthError`] taxonomy and rendered as a localised message. Nothing
//! propagates into the session holder or the gate.

pub mod auth;
pub mod cli;
pub mod gate;
pub mod profile;
pub mod provider;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
