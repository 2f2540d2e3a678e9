//! Session state for the current browsing session.
//!
//! The holder is the single consumer of the provider's session-change stream.
//! Readers only ever see [`SessionSnapshot`] values, never the channel.

mod holder;
mod identity;

pub use holder::SessionHolder;
pub use identity::{Identity, SessionSnapshot};
