//! Handler for link shortening endpoint.

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
};
use std::net::SocketAddr;
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::application::services::{CreateLinkRequest, Submitter};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_info::{client_ip, user_agent};

/// Vets a URL and creates a short link for it.
///
/// # Endpoint
///
/// `POST /shorten`
///
/// # Request Body
///
/// ```json
/// {
///   "url": "https://example.com/launch",
///   "intended_live_date": "2030-01-01T00:00:00Z",
///   "intended_expiry_date": "2030-06-01T00:00:00Z"
/// }
/// ```
///
/// Both dates are optional.
///
/// # Response
///
/// `201 Created`:
///
/// ```json
/// {
///   "short_code": "aZ3_k9Q-",
///   "short_url": "http://localhost:8080/aZ3_k9Q-",
///   "status": "pending",
///   "intended_live_date": "2030-01-01T00:00:00Z",
///   "intended_expiry_date": "2030-06-01T00:00:00Z",
///   "redirect_detected": false
/// }
/// ```
///
/// # Errors
///
/// - 400 for payload, syntax, scheme, date or safety rejections
/// - 502 / 503 when the safety check cannot give a verdict
/// - 500 on storage failures or code exhaustion
pub async fn shorten_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    payload.validate()?;

    let request = CreateLinkRequest {
        url: payload.url,
        intended_live_date: payload.intended_live_date,
        intended_expiry_date: payload.intended_expiry_date,
        submitter: Submitter {
            user_agent: user_agent(&headers),
            ip_address: Some(client_ip(&headers, addr, state.behind_proxy)),
        },
    };

    let created = state.link_service.create_link(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ShortenResponse::from_created(created, &state.base_url)),
    ))
}
