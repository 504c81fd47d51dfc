//! Repository trait for the malicious URL audit trail.

use crate::domain::entities::{MaliciousLog, NewMaliciousLog};
use crate::error::AppError;
use async_trait::async_trait;

/// Append-only store of flagged submissions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MaliciousLogRepository: Send + Sync {
    /// Appends one audit entry.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] on storage errors.
    async fn append(&self, entry: NewMaliciousLog) -> Result<MaliciousLog, AppError>;

    /// Most recent entries first. Only used by operator tooling.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] on storage errors.
    async fn list_recent(&self, limit: i64) -> Result<Vec<MaliciousLog>, AppError>;
}
