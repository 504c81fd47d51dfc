//! Header-only liveness probe.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{Client, StatusCode, redirect};
use std::time::Duration;

use crate::domain::vetting::{LivenessProbe, ProbeOutcome};

/// Issues a single `HEAD` request with redirects disabled.
pub struct HttpLivenessProbe {
    http: Client,
}

impl HttpLivenessProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .user_agent(concat!("safe-shortener/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http })
    }
}

/// Maps a response status to a probe outcome.
///
/// Every 3xx status counts as a reachable redirect, not only 301 and 302.
pub fn classify(status: StatusCode, headers: &HeaderMap) -> ProbeOutcome {
    if status.is_success() {
        ProbeOutcome::Live {
            status: status.as_u16(),
        }
    } else if status.is_redirection() {
        ProbeOutcome::Redirect {
            status: status.as_u16(),
            location: headers
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    } else {
        ProbeOutcome::Unreachable {
            status: Some(status.as_u16()),
            reason: status.to_string(),
        }
    }
}

#[async_trait]
impl LivenessProbe for HttpLivenessProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        match self.http.head(url).send().await {
            Ok(response) => classify(response.status(), response.headers()),
            Err(e) => {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.without_url().to_string()
                };
                tracing::debug!(url = %url, reason = %reason, "Liveness probe failed");
                ProbeOutcome::Unreachable {
                    status: None,
                    reason,
                }
            }
        }
    }
}
