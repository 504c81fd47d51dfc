//! Submitter metadata extraction from HTTP requests.

use axum::http::{HeaderMap, header};
use std::net::SocketAddr;

/// Maximum stored user agent length, matching the audit table column.
const MAX_USER_AGENT_LEN: usize = 512;

/// Resolves the client IP address for audit purposes.
///
/// When `behind_proxy` is set, the first `X-Forwarded-For` entry wins, then
/// `X-Real-IP`. Otherwise, or if neither header is usable, the socket peer
/// address is used. Forwarding headers are client-controlled, so they are only
/// trusted behind a reverse proxy that overwrites them.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr, behind_proxy: bool) -> String {
    if behind_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    peer.ip().to_string()
}

/// Returns the `User-Agent` header, truncated to the stored column length.
pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    let ua = headers.get(header::USER_AGENT)?.to_str().ok()?;

    let mut end = ua.len().min(MAX_USER_AGENT_LEN);
    while !ua.is_char_boundary(end) {
        end -= 1;
    }

    Some(ua[..end].to_string())
}
