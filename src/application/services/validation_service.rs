//! Ordered vetting of a submitted destination URL.
//!
//! The three stages are exposed separately so the caller can interleave its
//! own cheap checks (the requested dates) before any network call is made:
//!
//! 1. [`UrlValidator::check_syntax`] - pure parsing, no I/O
//! 2. [`UrlValidator::check_safety`] - threat lookup, audit entry on a match
//! 3. [`UrlValidator::check_liveness`] - `HEAD` probe, never rejects

use std::sync::Arc;

use serde_json::json;
use url::Url;

use crate::domain::entities::{BASELINE_RISK_SCORE, NewMaliciousLog};
use crate::domain::repositories::MaliciousLogRepository;
use crate::domain::vetting::{
    LivenessProbe, ProbeOutcome, SafetyCheckError, SafetyChecker, SafetyVerdict,
};
use crate::error::AppError;

/// Who submitted a URL, recorded only when the URL is flagged.
#[derive(Debug, Clone, Default)]
pub struct Submitter {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

pub struct UrlValidator {
    safety: Arc<dyn SafetyChecker>,
    probe: Arc<dyn LivenessProbe>,
    malicious_logs: Arc<dyn MaliciousLogRepository>,
}

impl UrlValidator {
    pub fn new(
        safety: Arc<dyn SafetyChecker>,
        probe: Arc<dyn LivenessProbe>,
        malicious_logs: Arc<dyn MaliciousLogRepository>,
    ) -> Self {
        Self {
            safety,
            probe,
            malicious_logs,
        }
    }

    /// Parses `raw` as an absolute `https` URL with a host.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidSyntax`] if the input does not parse or has
    /// no host, and [`AppError::NotHttps`] for any other scheme.
    pub fn check_syntax(raw: &str) -> Result<Url, AppError> {
        let trimmed = raw.trim();

        let url = Url::parse(trimmed).map_err(|e| {
            AppError::invalid_syntax(
                "URL could not be parsed",
                json!({ "url": trimmed, "reason": e.to_string() }),
            )
        })?;

        if url.host_str().is_none_or(str::is_empty) {
            return Err(AppError::invalid_syntax(
                "URL must include a host",
                json!({ "url": trimmed }),
            ));
        }

        if url.scheme() != "https" {
            return Err(AppError::not_https(
                "URL must use https",
                json!({ "url": trimmed, "scheme": url.scheme() }),
            ));
        }

        Ok(url)
    }

    /// Asks the threat-intelligence service about `url`.
    ///
    /// A positive match is written to the malicious log before the rejection
    /// is returned. Failing to write that entry does not change the outcome.
    ///
    /// # Errors
    ///
    /// - [`AppError::UnsafeUrl`] if the URL matched a threat list
    /// - [`AppError::SafetyCheckUnavailable`] if no credential is configured
    /// - [`AppError::SafetyCheckFailed`] if no verdict could be obtained
    pub async fn check_safety(&self, url: &Url, submitter: &Submitter) -> Result<(), AppError> {
        match self.safety.check(url.as_str()).await {
            Ok(SafetyVerdict::Safe) => Ok(()),
            Ok(SafetyVerdict::Unsafe { threat_type }) => {
                tracing::warn!(
                    url = %url,
                    threat_type = %threat_type,
                    ip = submitter.ip_address.as_deref().unwrap_or("-"),
                    "URL flagged by safety check"
                );

                let entry = NewMaliciousLog {
                    url: url.to_string(),
                    user_agent: submitter.user_agent.clone(),
                    ip_address: submitter.ip_address.clone(),
                    risk_score: BASELINE_RISK_SCORE,
                    details: format!("Failed Safe Browsing check: threat type {threat_type}"),
                };

                if let Err(e) = self.malicious_logs.append(entry).await {
                    tracing::error!(url = %url, error = %e, "Failed to record malicious URL");
                }

                Err(AppError::unsafe_url(
                    "URL was flagged as unsafe",
                    json!({ "url": url.as_str(), "threat_type": threat_type }),
                ))
            }
            Err(SafetyCheckError::MissingCredential) => Err(AppError::safety_check_unavailable(
                "Safety check credential is not configured",
                json!({ "url": url.as_str() }),
            )),
            Err(e) => Err(AppError::safety_check_failed(
                "Safety check did not return a verdict",
                json!({ "url": url.as_str(), "reason": e.to_string() }),
            )),
        }
    }

    /// Probes `url`; an unreachable destination is an outcome, not an error.
    pub async fn check_liveness(&self, url: &Url) -> ProbeOutcome {
        let outcome = self.probe.probe(url.as_str()).await;

        match &outcome {
            ProbeOutcome::Live { status } => {
                tracing::debug!(url = %url, status, "Destination is live");
            }
            ProbeOutcome::Redirect { status, location } => {
                tracing::info!(
                    url = %url,
                    status,
                    location = location.as_deref().unwrap_or("-"),
                    "Destination answers with a redirect"
                );
            }
            ProbeOutcome::Unreachable { status, reason } => {
                tracing::info!(url = %url, status = ?status, reason = %reason, "Destination is unreachable");
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::MaliciousLog;
    use crate::domain::repositories::MockMaliciousLogRepository;
    use crate::domain::vetting::{MockLivenessProbe, MockSafetyChecker};
    use chrono::Utc;

    fn validator(
        safety: MockSafetyChecker,
        probe: MockLivenessProbe,
        logs: MockMaliciousLogRepository,
    ) -> UrlValidator {
        UrlValidator::new(Arc::new(safety), Arc::new(probe), Arc::new(logs))
    }

    fn submitter() -> Submitter {
        Submitter {
            user_agent: Some("curl/8.0".to_string()),
            ip_address: Some("203.0.113.7".to_string()),
        }
    }

    fn https(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn test_syntax_accepts_https() {
        let url = UrlValidator::check_syntax("  https://example.com/path?q=1  ").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_syntax_rejects_unparseable() {
        for raw in ["", "not a url", "example.com/path", "https://"] {
            let err = UrlValidator::check_syntax(raw).unwrap_err();
            assert!(
                matches!(err, AppError::InvalidSyntax { .. }),
                "{raw:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_syntax_rejects_missing_host_before_scheme() {
        let err = UrlValidator::check_syntax("mailto:someone@example.com").unwrap_err();
        assert!(matches!(err, AppError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_syntax_rejects_other_schemes() {
        for raw in ["http://example.com", "ftp://example.com/file"] {
            let err = UrlValidator::check_syntax(raw).unwrap_err();
            assert!(matches!(err, AppError::NotHttps { .. }), "{raw:?}");
        }
    }

    #[tokio::test]
    async fn test_safe_url_writes_no_log() {
        let mut safety = MockSafetyChecker::new();
        safety
            .expect_check()
            .times(1)
            .returning(|_| Ok(SafetyVerdict::Safe));
        let mut logs = MockMaliciousLogRepository::new();
        logs.expect_append().times(0);

        let v = validator(safety, MockLivenessProbe::new(), logs);

        v.check_safety(&https("https://example.com"), &submitter())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unsafe_url_is_logged_and_rejected() {
        let mut safety = MockSafetyChecker::new();
        safety.expect_check().times(1).returning(|_| {
            Ok(SafetyVerdict::Unsafe {
                threat_type: "MALWARE".to_string(),
            })
        });

        let mut logs = MockMaliciousLogRepository::new();
        logs.expect_append()
            .withf(|entry| {
                entry.url == "https://bad.example/"
                    && entry.risk_score == BASELINE_RISK_SCORE
                    && entry.ip_address.as_deref() == Some("203.0.113.7")
                    && entry.user_agent.as_deref() == Some("curl/8.0")
                    && entry.details.contains("MALWARE")
            })
            .times(1)
            .returning(|entry| {
                Ok(MaliciousLog {
                    id: 1,
                    url: entry.url,
                    user_agent: entry.user_agent,
                    ip_address: entry.ip_address,
                    risk_score: entry.risk_score,
                    details: entry.details,
                    created_at: Utc::now(),
                })
            });

        let v = validator(safety, MockLivenessProbe::new(), logs);

        let err = v
            .check_safety(&https("https://bad.example"), &submitter())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsafeUrl { .. }));
        assert_eq!(err.to_error_info().details["threat_type"], "MALWARE");
    }

    #[tokio::test]
    async fn test_unsafe_url_rejected_even_if_log_fails() {
        let mut safety = MockSafetyChecker::new();
        safety.expect_check().returning(|_| {
            Ok(SafetyVerdict::Unsafe {
                threat_type: "SOCIAL_ENGINEERING".to_string(),
            })
        });
        let mut logs = MockMaliciousLogRepository::new();
        logs.expect_append()
            .times(1)
            .returning(|_| Err(AppError::persistence("Database error", json!({}))));

        let v = validator(safety, MockLivenessProbe::new(), logs);

        let err = v
            .check_safety(&https("https://phish.example"), &Submitter::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsafeUrl { .. }));
    }

    #[tokio::test]
    async fn test_missing_credential_is_unavailable() {
        let mut safety = MockSafetyChecker::new();
        safety
            .expect_check()
            .returning(|_| Err(SafetyCheckError::MissingCredential));
        let mut logs = MockMaliciousLogRepository::new();
        logs.expect_append().times(0);

        let v = validator(safety, MockLivenessProbe::new(), logs);

        let err = v
            .check_safety(&https("https://example.com"), &submitter())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SafetyCheckUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_not_a_verdict() {
        let mut safety = MockSafetyChecker::new();
        safety.expect_check().returning(|_| {
            Err(SafetyCheckError::Upstream {
                status: Some(500),
                reason: "upstream answered 500".to_string(),
            })
        });
        let mut logs = MockMaliciousLogRepository::new();
        logs.expect_append().times(0);

        let v = validator(safety, MockLivenessProbe::new(), logs);

        let err = v
            .check_safety(&https("https://example.com"), &submitter())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SafetyCheckFailed { .. }));
    }

    #[tokio::test]
    async fn test_liveness_passes_outcome_through() {
        let mut probe = MockLivenessProbe::new();
        probe
            .expect_probe()
            .withf(|url| url == "https://example.com/")
            .times(1)
            .returning(|_| ProbeOutcome::Unreachable {
                status: Some(404),
                reason: "404 Not Found".to_string(),
            });

        let v = validator(
            MockSafetyChecker::new(),
            probe,
            MockMaliciousLogRepository::new(),
        );

        let outcome = v.check_liveness(&https("https://example.com")).await;
        assert!(!outcome.is_reachable());
    }
}
