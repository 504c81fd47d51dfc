//! Repository trait for URL mapping data access.

use crate::domain::entities::{LinkStatus, NewUrlMapping, UrlMapping};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository interface for URL mappings.
///
/// Short code uniqueness is enforced here, by the storage layer, never by a
/// read-then-write check in callers.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgUrlMappingRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::InMemoryStore`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlMappingRepository: Send + Sync {
    /// Inserts a new mapping.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the short code is already taken.
    /// Returns [`AppError::PersistenceFailure`] on storage errors.
    async fn create(&self, new_mapping: NewUrlMapping) -> Result<UrlMapping, AppError>;

    /// Finds a mapping by its short code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] on storage errors.
    async fn find_by_short_code(&self, code: &str) -> Result<Option<UrlMapping>, AppError>;

    /// Finds a mapping by its numeric id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] on storage errors.
    async fn find_by_id(&self, id: i64) -> Result<Option<UrlMapping>, AppError>;

    /// Records the outcome of a liveness check on a single row.
    ///
    /// Returns `Ok(false)` if no mapping has this id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] on storage errors.
    async fn update_status(
        &self,
        id: i64,
        status: LinkStatus,
        last_checked_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Lists mappings, newest first, optionally filtered by stored status.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] on storage errors.
    async fn list(
        &self,
        status: Option<LinkStatus>,
        limit: i64,
    ) -> Result<Vec<UrlMapping>, AppError>;

    /// Lists `live` and `inactive` mappings whose check interval has elapsed
    /// since `last_checked_at` and which have not expired at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] on storage errors.
    async fn list_due_for_recheck(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<UrlMapping>, AppError>;

    /// Verifies that storage is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] if it is not.
    async fn ping(&self) -> Result<(), AppError>;
}
