//! Persisted deferred liveness re-check.

use chrono::{DateTime, Utc};

/// One pending re-check per mapping.
///
/// Rows survive restarts so the scheduler can re-arm them on startup; a row is
/// removed once its check has fired.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledCheck {
    pub mapping_id: i64,
    pub fire_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ScheduledCheck {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.fire_at <= now
    }
}
