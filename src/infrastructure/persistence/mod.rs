//! Storage backends for the domain repository traits.
//!
//! # Backends
//!
//! - [`PgUrlMappingRepository`], [`PgMaliciousLogRepository`],
//!   [`PgScheduledCheckRepository`] - PostgreSQL via SQLx
//! - [`InMemoryStore`] - All three traits over `DashMap`, for development and tests
//!
//! [`Stores`] bundles one implementation of each trait so the rest of the
//! application never needs to know which backend is active.

pub mod memory;
pub mod pg_malicious_log_repository;
pub mod pg_scheduled_check_repository;
pub mod pg_url_mapping_repository;

pub use memory::InMemoryStore;
pub use pg_malicious_log_repository::PgMaliciousLogRepository;
pub use pg_scheduled_check_repository::PgScheduledCheckRepository;
pub use pg_url_mapping_repository::PgUrlMappingRepository;

use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::repositories::{
    MaliciousLogRepository, ScheduledCheckRepository, UrlMappingRepository,
};

/// The selected storage backend, one handle per repository.
#[derive(Clone)]
pub struct Stores {
    pub mappings: Arc<dyn UrlMappingRepository>,
    pub malicious_logs: Arc<dyn MaliciousLogRepository>,
    pub checks: Arc<dyn ScheduledCheckRepository>,
}

impl Stores {
    pub fn postgres(pool: Arc<PgPool>) -> Self {
        Self {
            mappings: Arc::new(PgUrlMappingRepository::new(pool.clone())),
            malicious_logs: Arc::new(PgMaliciousLogRepository::new(pool.clone())),
            checks: Arc::new(PgScheduledCheckRepository::new(pool)),
        }
    }

    /// Shares a single [`InMemoryStore`] across all three roles.
    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(InMemoryStore::new()))
    }

    pub fn from_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            mappings: store.clone(),
            malicious_logs: store.clone(),
            checks: store,
        }
    }
}
