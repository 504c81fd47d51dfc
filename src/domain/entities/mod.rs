//! Core domain entities.
//!
//! # Entity Types
//!
//! - [`UrlMapping`] - A short code mapped to a destination, with its lifecycle status
//! - [`MaliciousLog`] - Audit entry for a URL flagged by the safety check
//! - [`ScheduledCheck`] - A persisted deferred liveness re-check
//!
//! Creation inputs use separate `New*` structs, as storage assigns ids and
//! timestamps.

pub mod malicious_log;
pub mod scheduled_check;
pub mod url_mapping;

pub use malicious_log::{BASELINE_RISK_SCORE, MaliciousLog, NewMaliciousLog};
pub use scheduled_check::ScheduledCheck;
pub use url_mapping::{DEFAULT_CHECK_INTERVAL_HOURS, LinkStatus, NewUrlMapping, UrlMapping};
