//! DTOs for link shortening endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::services::CreatedLink;
use crate::domain::entities::LinkStatus;

/// Request to shorten a single URL.
///
/// Dates are RFC 3339 timestamps. Only the payload shape is checked here; URL
/// syntax and date rules are enforced by the link service.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    #[validate(length(min = 1, max = 2048, message = "URL must be 1 to 2048 characters"))]
    pub url: String,

    /// Before this time an unreachable destination waits as `pending`.
    pub intended_live_date: Option<DateTime<Utc>>,

    /// From this time on the link answers 410 Gone.
    pub intended_expiry_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub short_code: String,
    pub short_url: String,
    pub status: LinkStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub intended_live_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub intended_expiry_date: Option<DateTime<Utc>>,

    pub redirect_detected: bool,
}

impl ShortenResponse {
    pub fn from_created(created: CreatedLink, base_url: &str) -> Self {
        let mapping = created.mapping;
        let short_url = format!("{}/{}", base_url.trim_end_matches('/'), mapping.short_code);

        Self {
            short_code: mapping.short_code,
            short_url,
            status: mapping.status,
            intended_live_date: mapping.intended_live_date,
            intended_expiry_date: mapping.intended_expiry_date,
            redirect_detected: created.redirect_detected,
        }
    }
}
