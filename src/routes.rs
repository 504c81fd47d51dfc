//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `POST /shorten`  - Vet a URL and create a short link (rate limited)
//! - `GET  /{code}`   - Short link redirect (rate limited)
//! - `GET  /health`   - Health check: storage, safety check credential
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-client token bucket (configurable for proxy deployments)
//! - **Path normalization** - Trailing slash handling

use crate::api::handlers::{health_handler, redirect_handler, shorten_handler};
use crate::api::middleware::rate_limit::{self, RateLimitConfig};
use crate::api::middleware::tracing;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
///
/// The server must be started with `into_make_service_with_connect_info` so
/// handlers and the limiter can read the peer address.
///
/// # Errors
///
/// Returns an error if the rate limit settings are invalid.
pub fn app_router(
    state: AppState,
    rate_limit: &RateLimitConfig,
) -> anyhow::Result<NormalizePath<Router>> {
    let public = Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/{code}", get(redirect_handler));
    let public = rate_limit::apply(public, rate_limit)?;

    let router = Router::new()
        .merge(public)
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(tracing::layer());

    Ok(NormalizePathLayer::trim_trailing_slash().layer(router))
}
