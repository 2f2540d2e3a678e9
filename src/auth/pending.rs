//! Duplicate-submission latch: at most one in-flight call per operation.

use super::errors::{AuthError, AuthOperation};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

#[derive(Clone, Debug, Default)]
pub struct PendingOperations {
    in_flight: Arc<Mutex<HashSet<AuthOperation>>>,
}

impl PendingOperations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `operation` as in flight until the returned guard drops.
    ///
    /// # Errors
    /// `AlreadyPending` if the operation is already running.
    pub fn begin(&self, operation: AuthOperation) -> Result<PendingGuard, AuthError> {
        self.begin_exclusive(operation, &[])
    }

    /// Like [`Self::begin`], but also refused while any of `conflicts` runs.
    /// Used for operations that share provider-side state.
    ///
    /// # Errors
    /// `AlreadyPending` naming the operation that is running.
    pub fn begin_exclusive(
        &self,
        operation: AuthOperation,
        conflicts: &[AuthOperation],
    ) -> Result<PendingGuard, AuthError> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = conflicts.iter().find(|other| in_flight.contains(*other)) {
            return Err(AuthError::AlreadyPending(*running));
        }
        if !in_flight.insert(operation) {
            return Err(AuthError::AlreadyPending(operation));
        }
        Ok(PendingGuard {
            in_flight: Arc::clone(&self.in_flight),
            operation,
        })
    }

    #[must_use]
    pub fn is_pending(&self, operation: AuthOperation) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&operation)
    }
}

#[derive(Debug)]
pub struct PendingGuard {
    in_flight: Arc<Mutex<HashSet<AuthOperation>>>,
    operation: AuthOperation,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.operation);
    }
}
