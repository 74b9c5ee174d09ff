//! Typed HTTP client for a calendar server.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/digest` | Submit `{"digest": hex}`, returns a `PendingCommitment` |
//! | GET    | `/timestamp/{commitment}` | `404` while pending, `200` with a `CalendarAttestation` once anchored |

use std::time::Duration;

use async_trait::async_trait;
use notary_core::ContentDigest;
use serde::Serialize;

use crate::config::{CalendarConfig, ConfigError};
use crate::error::AttestationError;
use crate::network::{AttestationNetwork, NetworkResolution};
use crate::proof::{CalendarAttestation, PendingCommitment};
use crate::retry::RetryPolicy;

#[derive(Debug, Serialize)]
struct SubmitRequest {
    digest: String,
}

/// Client for a single calendar server.
#[derive(Debug, Clone)]
pub struct CalendarClient {
    http: reqwest::Client,
    base: String,
    retry: RetryPolicy,
}

impl CalendarClient {
    /// Create a new calendar client from configuration.
    pub fn new(config: CalendarConfig) -> Result<Self, AttestationError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| AttestationError::Config(ConfigError::InvalidToken))?,
            );
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| AttestationError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base: config.url.as_str().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the default retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl AttestationNetwork for CalendarClient {
    fn name(&self) -> &str {
        &self.base
    }

    /// Calls `POST {base}/digest`.
    async fn submit(&self, digest: &ContentDigest) -> Result<PendingCommitment, AttestationError> {
        let endpoint = "POST /digest";
        let url = format!("{}/digest", self.base);
        let body = SubmitRequest {
            digest: digest.to_hex(),
        };

        let resp = self
            .retry
            .send(endpoint, || self.http.post(&url).json(&body).send())
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AttestationError::Api {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        let mut pending: PendingCommitment =
            resp.json()
                .await
                .map_err(|e| AttestationError::Deserialization {
                    endpoint: endpoint.into(),
                    source: e,
                })?;
        if pending.calendar.is_empty() {
            pending.calendar = self.base.clone();
        }
        tracing::debug!(calendar = %self.base, digest = %digest, "calendar accepted digest");
        Ok(pending)
    }

    /// Calls `GET {base}/timestamp/{commitment}`.
    async fn resolve(
        &self,
        _digest: &ContentDigest,
        pending: &PendingCommitment,
    ) -> Result<NetworkResolution, AttestationError> {
        let commitment = pending.commitment_hex();
        let endpoint = format!("GET /timestamp/{commitment}");
        let url = format!("{}/timestamp/{commitment}", self.base);

        let resp = self
            .retry
            .send(&endpoint, || self.http.get(&url).send())
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(NetworkResolution::Pending);
        }

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AttestationError::Api {
                endpoint,
                status,
                body,
            });
        }

        let attestation: CalendarAttestation =
            resp.json()
                .await
                .map_err(|e| AttestationError::Deserialization {
                    endpoint,
                    source: e,
                })?;
        Ok(NetworkResolution::Confirmed(attestation))
    }
}
