//! Shared state injected into every handler.

use std::sync::Arc;

use crate::application::services::{LinkService, RecheckScheduler, RedirectResolver};
use crate::domain::repositories::UrlMappingRepository;
use crate::domain::vetting::SafetyChecker;

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService>,
    pub resolver: Arc<RedirectResolver>,
    pub scheduler: RecheckScheduler,
    /// Used by the health check to probe storage.
    pub mappings: Arc<dyn UrlMappingRepository>,
    /// Used by the health check to report whether a credential is set.
    pub safety: Arc<dyn SafetyChecker>,
    /// Public prefix of generated short URLs, without a trailing slash.
    pub base_url: String,
    /// Trust `X-Forwarded-For` / `X-Real-IP` for the submitter address.
    pub behind_proxy: bool,
}
