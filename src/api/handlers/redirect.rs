//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Response Codes
///
/// - **302 Found**: `Location` is the stored URL, unchanged
/// - **404 Not Found**: malformed or unknown code
/// - **410 Gone**: the link is expired, pending or inactive
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let target = state.resolver.resolve(&code).await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, target)]))
}
