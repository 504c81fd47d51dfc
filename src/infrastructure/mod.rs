//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for data persistence and the outbound URL checks.
//!
//! # Modules
//!
//! - [`persistence`] - PostgreSQL and in-memory repository implementations
//! - [`safe_browsing`] - Google Safe Browsing threat lookups
//! - [`http_probe`] - `HEAD`-based liveness probe

pub mod http_probe;
pub mod persistence;
pub mod safe_browsing;

pub use http_probe::HttpLivenessProbe;
pub use safe_browsing::SafeBrowsingClient;
