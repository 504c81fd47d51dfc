//! Per-client rate limiting using a token bucket.

use axum::Router;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{KeyExtractor, PeerIpKeyExtractor, SmartIpKeyExtractor},
};

/// Token bucket settings shared by every rate-limited route.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Tokens replenished per second.
    pub per_second: u64,
    /// Bucket size, i.e. requests allowed in a burst.
    pub burst_size: u32,
    /// Key clients by `X-Forwarded-For` / `X-Real-IP` instead of the socket
    /// peer. Enable only behind a reverse proxy that sets these headers.
    pub behind_proxy: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 1,
            burst_size: 3,
            behind_proxy: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid rate limit: {per_second}/s with burst {burst_size}")]
pub struct InvalidRateLimit {
    pub per_second: u64,
    pub burst_size: u32,
}

/// Wraps `router` in a limiter built from `config`.
///
/// Requests over the limit receive `429 Too Many Requests`. Peer-address
/// keying requires the server to provide `ConnectInfo<SocketAddr>`.
///
/// # Errors
///
/// Returns [`InvalidRateLimit`] if either setting is zero.
pub fn apply<S>(router: Router<S>, config: &RateLimitConfig) -> Result<Router<S>, InvalidRateLimit>
where
    S: Clone + Send + Sync + 'static,
{
    if config.behind_proxy {
        Ok(router.layer(governor_layer(config, SmartIpKeyExtractor)?))
    } else {
        Ok(router.layer(governor_layer(config, PeerIpKeyExtractor)?))
    }
}

fn governor_layer<K>(
    config: &RateLimitConfig,
    extractor: K,
) -> Result<
    GovernorLayer<K, governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>, axum::body::Body>,
    InvalidRateLimit,
>
where
    K: KeyExtractor,
{
    let invalid = || InvalidRateLimit {
        per_second: config.per_second,
        burst_size: config.burst_size,
    };

    if config.per_second == 0 || config.burst_size == 0 {
        return Err(invalid());
    }

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .key_extractor(extractor)
        .finish()
        .ok_or_else(invalid)?;

    Ok(GovernorLayer::new(Arc::new(governor_conf)))
}
