//! Contracts for the outbound checks run against a candidate URL.
//!
//! Implementations live in [`crate::infrastructure`]; mocks are generated with
//! `mockall` for unit tests.

use async_trait::async_trait;

/// Result of a header-only liveness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The destination answered with a 2xx status.
    Live { status: u16 },
    /// The destination answered with a 3xx status; redirects are not followed.
    Redirect {
        status: u16,
        location: Option<String>,
    },
    /// Any other status, a network failure, or a timeout.
    Unreachable {
        status: Option<u16>,
        reason: String,
    },
}

impl ProbeOutcome {
    /// Whether the destination currently responds.
    ///
    /// A redirect answer counts as reachable; the redirect chain is only
    /// reported, it does not reject the URL.
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Live { .. } | Self::Redirect { .. })
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }
}

/// Liveness collaborator: header-only fetch, no redirect following, bounded
/// timeout. Never fails; every problem is folded into
/// [`ProbeOutcome::Unreachable`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// Answer of the threat-intelligence service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyVerdict {
    Safe,
    Unsafe { threat_type: String },
}

/// Failure to obtain a verdict. Distinct from an unsafe verdict.
#[derive(Debug, thiserror::Error)]
pub enum SafetyCheckError {
    #[error("safety check API key is not configured")]
    MissingCredential,

    #[error("safety check request failed: {reason}")]
    Upstream {
        status: Option<u16>,
        reason: String,
    },

    #[error("safety check response is malformed: {0}")]
    MalformedResponse(String),
}

/// Threat-intelligence collaborator covering malware and social-engineering
/// threats on any platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SafetyChecker: Send + Sync {
    async fn check(&self, url: &str) -> Result<SafetyVerdict, SafetyCheckError>;

    /// Whether a credential is configured; used by the health check.
    fn is_configured(&self) -> bool;
}
