//! Google Safe Browsing v4 lookup client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::vetting::{SafetyCheckError, SafetyChecker, SafetyVerdict};

pub const DEFAULT_ENDPOINT: &str = "https://safebrowsing.googleapis.com/v4/threatMatches:find";
pub const DEFAULT_CLIENT_ID: &str = "safe-shortener";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindThreatMatchesRequest<'a> {
    client: ClientInfo<'a>,
    threat_info: ThreatInfo<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo<'a> {
    client_id: &'a str,
    client_version: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatInfo<'a> {
    threat_types: &'a [ThreatType],
    platform_types: &'a [PlatformType],
    threat_entry_types: &'a [ThreatEntryType],
    threat_entries: Vec<ThreatEntry<'a>>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum ThreatType {
    Malware,
    SocialEngineering,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum PlatformType {
    AnyPlatform,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum ThreatEntryType {
    Url,
}

#[derive(Debug, Serialize)]
struct ThreatEntry<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct FindThreatMatchesResponse {
    #[serde(default)]
    matches: Vec<ThreatMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreatMatch {
    threat_type: String,
}

const THREAT_TYPES: [ThreatType; 2] = [ThreatType::Malware, ThreatType::SocialEngineering];
const PLATFORM_TYPES: [PlatformType; 1] = [PlatformType::AnyPlatform];
const THREAT_ENTRY_TYPES: [ThreatEntryType; 1] = [ThreatEntryType::Url];

/// Safe Browsing client covering malware and social-engineering threats.
///
/// An empty response object means "no match". A missing API key is reported
/// as [`SafetyCheckError::MissingCredential`] without any network call.
pub struct SafeBrowsingClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    client_id: String,
}

impl SafeBrowsingClient {
    pub fn new(
        api_key: Option<String>,
        endpoint: impl Into<String>,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client_id: client_id.into(),
        })
    }
}

#[async_trait]
impl SafetyChecker for SafeBrowsingClient {
    async fn check(&self, url: &str) -> Result<SafetyVerdict, SafetyCheckError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(SafetyCheckError::MissingCredential);
        };

        let body = FindThreatMatchesRequest {
            client: ClientInfo {
                client_id: &self.client_id,
                client_version: env!("CARGO_PKG_VERSION"),
            },
            threat_info: ThreatInfo {
                threat_types: &THREAT_TYPES,
                platform_types: &PLATFORM_TYPES,
                threat_entry_types: &THREAT_ENTRY_TYPES,
                threat_entries: vec![ThreatEntry { url }],
            },
        };

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| SafetyCheckError::Upstream {
                status: None,
                reason: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.without_url().to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SafetyCheckError::Upstream {
                status: Some(status.as_u16()),
                reason: format!("upstream answered {status}"),
            });
        }

        let parsed: FindThreatMatchesResponse = response
            .json()
            .await
            .map_err(|e| SafetyCheckError::MalformedResponse(e.without_url().to_string()))?;

        Ok(match parsed.matches.into_iter().next() {
            Some(m) => SafetyVerdict::Unsafe {
                threat_type: m.threat_type,
            },
            None => SafetyVerdict::Safe,
        })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
