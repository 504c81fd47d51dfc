//! Short code to destination resolution.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::entities::LinkStatus;
use crate::domain::lifecycle::effective_status;
use crate::domain::repositories::UrlMappingRepository;
use crate::error::AppError;
use crate::utils::code_generator::is_valid_code;

/// Read-only lookup used by the redirect endpoint.
///
/// Expiry is applied lazily: a mapping past its intended expiry date is
/// treated as gone even while its stored status still says `live`.
pub struct RedirectResolver {
    mappings: Arc<dyn UrlMappingRepository>,
}

impl RedirectResolver {
    pub fn new(mappings: Arc<dyn UrlMappingRepository>) -> Self {
        Self { mappings }
    }

    /// Resolves `code` against the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::resolve_at`].
    pub async fn resolve(&self, code: &str) -> Result<String, AppError> {
        self.resolve_at(code, Utc::now()).await
    }

    /// Returns the stored destination for a live, unexpired mapping.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the code is malformed or unknown
    /// - [`AppError::Gone`] if the mapping is expired or not live
    /// - [`AppError::PersistenceFailure`] on storage errors
    pub async fn resolve_at(&self, code: &str, now: DateTime<Utc>) -> Result<String, AppError> {
        if !is_valid_code(code) {
            metrics::counter!("redirects_total", "outcome" => "not_found").increment(1);
            return Err(AppError::not_found(
                "Short link not found",
                json!({ "short_code": code }),
            ));
        }

        let Some(mapping) = self.mappings.find_by_short_code(code).await? else {
            metrics::counter!("redirects_total", "outcome" => "not_found").increment(1);
            return Err(AppError::not_found(
                "Short link not found",
                json!({ "short_code": code }),
            ));
        };

        let status = effective_status(&mapping, now);
        if status != LinkStatus::Live {
            metrics::counter!("redirects_total", "outcome" => "gone").increment(1);
            tracing::debug!(short_code = %code, status = %status, "Redirect refused");
            return Err(AppError::gone(
                "Short link is not active",
                json!({ "short_code": code, "status": status }),
            ));
        }

        metrics::counter!("redirects_total", "outcome" => "redirected").increment(1);
        Ok(mapping.original_url)
    }
}
