//! Repository trait definitions for the domain layer.
//!
//! These traits are the persistence collaborator contract. Concrete
//! implementations live in `crate::infrastructure::persistence`; mocks are
//! auto-generated via `mockall` for unit tests.
//!
//! # Available Repositories
//!
//! - [`UrlMappingRepository`] - Mappings keyed by short code and by id
//! - [`MaliciousLogRepository`] - Append-only audit trail of flagged URLs
//! - [`ScheduledCheckRepository`] - Durable deferred re-checks

pub mod malicious_log_repository;
pub mod scheduled_check_repository;
pub mod url_mapping_repository;

pub use malicious_log_repository::MaliciousLogRepository;
pub use scheduled_check_repository::ScheduledCheckRepository;
pub use url_mapping_repository::UrlMappingRepository;

#[cfg(test)]
pub use malicious_log_repository::MockMaliciousLogRepository;
#[cfg(test)]
pub use scheduled_check_repository::MockScheduledCheckRepository;
#[cfg(test)]
pub use url_mapping_repository::MockUrlMappingRepository;
