//! Repository trait for persisted deferred re-checks.

use crate::domain::entities::ScheduledCheck;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable schedule of pending liveness re-checks, at most one per mapping.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduledCheckRepository: Send + Sync {
    /// Stores the check for `mapping_id`, replacing any earlier fire time.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] on storage errors.
    async fn upsert(
        &self,
        mapping_id: i64,
        fire_at: DateTime<Utc>,
    ) -> Result<ScheduledCheck, AppError>;

    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] on storage errors.
    async fn find(&self, mapping_id: i64) -> Result<Option<ScheduledCheck>, AppError>;

    /// Deletes the check. Returns `Ok(false)` if there was none.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] on storage errors.
    async fn remove(&self, mapping_id: i64) -> Result<bool, AppError>;

    /// All stored checks, earliest fire time first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] on storage errors.
    async fn list_pending(&self) -> Result<Vec<ScheduledCheck>, AppError>;
}
