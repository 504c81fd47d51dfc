//! URL mapping entity and its lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hours between periodic re-checks when none is requested.
pub const DEFAULT_CHECK_INTERVAL_HOURS: i32 = 24;

/// Lifecycle status of a mapping.
///
/// Only [`LinkStatus::Live`] mappings are redirected. [`LinkStatus::Expired`]
/// is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Pending,
    Live,
    Inactive,
    Expired,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Live => "live",
            Self::Inactive => "inactive",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored or user-supplied status string is unknown.
#[derive(Debug, thiserror::Error)]
#[error("unknown link status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for LinkStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "live" => Ok(Self::Live),
            "inactive" => Ok(Self::Inactive),
            "expired" => Ok(Self::Expired),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A short code mapped to a destination URL.
///
/// `id`, `short_code`, `original_url` and the intended dates never change after
/// creation; only `status` and `last_checked_at` are updated.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlMapping {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub intended_live_date: Option<DateTime<Utc>>,
    pub intended_expiry_date: Option<DateTime<Utc>>,
    pub last_checked_at: DateTime<Utc>,
    pub status: LinkStatus,
    pub check_interval_hours: i32,
}

impl UrlMapping {
    /// Returns true once `now` has reached the intended expiry date.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.intended_expiry_date.is_some_and(|expiry| now >= expiry)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Input data for inserting a new mapping.
#[derive(Debug, Clone)]
pub struct NewUrlMapping {
    pub short_code: String,
    pub original_url: String,
    pub intended_live_date: Option<DateTime<Utc>>,
    pub intended_expiry_date: Option<DateTime<Utc>>,
    pub last_checked_at: DateTime<Utc>,
    pub status: LinkStatus,
    pub check_interval_hours: i32,
}
