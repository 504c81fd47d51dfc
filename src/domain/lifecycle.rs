//! Lifecycle rules deciding a mapping's status.
//!
//! Pure functions over probe results and the current time; nothing here
//! touches storage or the network.
//!
//! ```text
//!            reachable                unreachable
//!  pending ────────────► live ◄───────────────────┐
//!     │                   │  ▲                    │
//!     │ unreachable       │  │ reachable          │
//!     ▼                   ▼  │                    │
//!  inactive ◄──────────── inactive ───────────────┘
//!
//!  any ──(now ≥ intended_expiry_date)──► expired   (terminal)
//! ```

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::entities::{LinkStatus, UrlMapping};
use crate::error::AppError;

/// Status assigned when a mapping is created.
///
/// A destination that answered the creation-time probe is `live`. Otherwise a
/// future intended live date means a re-check will run, so the mapping waits
/// as `pending`; without one it is `inactive`.
pub fn initial_status(
    reachable: bool,
    intended_live_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> LinkStatus {
    if reachable {
        LinkStatus::Live
    } else if intended_live_date.is_some_and(|live| live > now) {
        LinkStatus::Pending
    } else {
        LinkStatus::Inactive
    }
}

/// Status after a re-check (scheduled or manual).
///
/// `expired` wins over any probe result and is never left.
pub fn next_status(current: LinkStatus, reachable: bool, expired: bool) -> LinkStatus {
    if expired || current == LinkStatus::Expired {
        return LinkStatus::Expired;
    }

    if reachable {
        LinkStatus::Live
    } else {
        LinkStatus::Inactive
    }
}

/// Status as seen at `now`, applying lazy expiry over the stored field.
pub fn effective_status(mapping: &UrlMapping, now: DateTime<Utc>) -> LinkStatus {
    if mapping.is_expired_at(now) {
        LinkStatus::Expired
    } else {
        mapping.status
    }
}

/// Validates the intended dates supplied at creation.
///
/// # Errors
///
/// Returns [`AppError::Validation`] if:
/// - the expiry date is not in the future
/// - the live date is not in the future
/// - the live date is after the expiry date
pub fn check_requested_dates(
    intended_live_date: Option<DateTime<Utc>>,
    intended_expiry_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if let Some(expiry) = intended_expiry_date
        && expiry <= now
    {
        return Err(AppError::bad_request(
            "Intended expiry date must be in the future",
            json!({ "field": "intended_expiry_date", "value": expiry }),
        ));
    }

    if let Some(live) = intended_live_date
        && live <= now
    {
        return Err(AppError::bad_request(
            "Intended live date must be in the future",
            json!({ "field": "intended_live_date", "value": live }),
        ));
    }

    if let (Some(live), Some(expiry)) = (intended_live_date, intended_expiry_date)
        && live > expiry
    {
        return Err(AppError::bad_request(
            "Intended live date must not be after the intended expiry date",
            json!({ "intended_live_date": live, "intended_expiry_date": expiry }),
        ));
    }

    Ok(())
}
