//! Audit record of a URL flagged by the safety check.

use chrono::{DateTime, Utc};

/// Risk score assigned to every flagged submission.
pub const BASELINE_RISK_SCORE: i32 = 5;

/// Append-only audit entry. Never updated or deleted.
#[derive(Debug, Clone)]
pub struct MaliciousLog {
    pub id: i64,
    pub url: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub risk_score: i32,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

/// Input data for appending an audit entry.
#[derive(Debug, Clone)]
pub struct NewMaliciousLog {
    pub url: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub risk_score: i32,
    pub details: String,
}
