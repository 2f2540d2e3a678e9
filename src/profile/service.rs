use super::record::{ProfileDraft, ProfileRecord};
use crate::{
    auth::{AuthError, ProfileOperation},
    provider::{ProfileStore, StoreError},
    session::Identity,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Reads and writes the profile of an identity captured at call time. Store
/// failures are reported as `ProfileIo` and never touch session state.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
}

impl ProfileService {
    #[must_use]
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Return the stored profile, creating an empty one on first access.
    ///
    /// # Errors
    /// `ProfileIo` when the store cannot be read or the initial record written.
    #[instrument(skip(self, identity), fields(identity_id = %identity.id))]
    pub async fn load(&self, identity: &Identity) -> Result<ProfileRecord, AuthError> {
        let io_error = |err: StoreError| AuthError::profile_io(ProfileOperation::Load, &err);
        let access = self.store.authorize(&identity.id).await.map_err(io_error)?;
        let existing = self.store.read_record(&access).await.map_err(io_error)?;

        if let Some(record) = existing {
            debug!("profile loaded");
            return Ok(record);
        }

        let record = ProfileRecord::initial(&identity.email, Utc::now());
        self.store
            .write_record(&access, &record)
            .await
            .map_err(io_error)?;
        info!("profile created");
        Ok(record)
    }

    /// Write the edited fields. `email` is mirrored from the identity,
    /// `updatedAt` is set to now and `createdAt` is kept (or set if missing).
    ///
    /// # Errors
    /// `ProfileIo` when the store cannot be read or written.
    #[instrument(skip(self, identity, draft), fields(identity_id = %identity.id))]
    pub async fn save(
        &self,
        identity: &Identity,
        draft: &ProfileDraft,
    ) -> Result<ProfileRecord, AuthError> {
        let io_error = |err: StoreError| AuthError::profile_io(ProfileOperation::Save, &err);
        // A sign-out after this point does not cancel the save.
        let access = self.store.authorize(&identity.id).await.map_err(io_error)?;
        let existing = self.store.read_record(&access).await.map_err(io_error)?;

        let now = Utc::now();
        let record = ProfileRecord {
            display_name: draft.display_name.clone(),
            phone_number: draft.phone_number.clone(),
            address: draft.address.clone(),
            email: identity.email.clone(),
            created_at: existing
                .and_then(|record| record.created_at)
                .or(Some(now)),
            updated_at: Some(now),
        };

        self.store
            .write_record(&access, &record)
            .await
            .map_err(io_error)?;
        info!("profile saved");
        Ok(record)
    }

    /// Best-effort creation of the profile right after sign-up.
    pub async fn seed(&self, identity: &Identity) -> Option<ProfileRecord> {
        match self.load(identity).await {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(identity_id = %identity.id, "profile not seeded: {err}");
                None
            }
        }
    }
}
