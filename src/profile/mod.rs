//! Per-identity profile records kept in the external key-value store.

mod record;
mod service;

pub use record::{ProfileDraft, ProfileRecord};
pub use service::ProfileService;
