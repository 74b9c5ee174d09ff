//! # Calendar Retry Policy
//!
//! A calendar call is retried when it got no answer (connection refused,
//! request timed out) or when the calendar answered "try again later":
//! `429`, `502`, `503`, `504`. Every other answer goes back to the caller
//! after the first attempt.
//!
//! Delays double from `base_delay` and never exceed `max_delay`. A
//! `Retry-After: <seconds>` header on a transient answer replaces the
//! computed delay, subject to the same cap. When the budget runs out the
//! last answer is returned as-is, so a persistent `503` still surfaces as
//! an `Api` error carrying the calendar's body.

use std::future::Future;
use std::time::Duration;

use reqwest::{header::RETRY_AFTER, Response, StatusCode};

use crate::error::AttestationError;

/// Statuses a calendar uses to shed load or report a broken upstream.
const TRANSIENT_STATUSES: [StatusCode; 4] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// How a [`CalendarClient`](crate::CalendarClient) retries transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Send once, never retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt + 1`.
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.min(16))
            .min(self.max_delay)
    }

    /// Run `request` until it yields a final answer or the budget is spent.
    pub(crate) async fn send<F, Fut>(
        &self,
        endpoint: &str,
        request: F,
    ) -> Result<Response, AttestationError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Response, reqwest::Error>>,
    {
        let mut attempt = 0u32;
        loop {
            let result = request().await;
            let retryable = match &result {
                Ok(resp) => is_transient(resp.status()),
                Err(e) => e.is_connect() || e.is_timeout(),
            };
            if !retryable || attempt >= self.max_retries {
                return result.map_err(|source| AttestationError::Http {
                    endpoint: endpoint.to_string(),
                    source,
                });
            }

            let delay = match &result {
                Ok(resp) => {
                    let delay = retry_after(resp)
                        .unwrap_or_else(|| self.backoff(attempt))
                        .min(self.max_delay);
                    tracing::warn!(
                        endpoint,
                        status = resp.status().as_u16(),
                        attempt = attempt + 1,
                        ?delay,
                        "calendar busy, retrying"
                    );
                    delay
                }
                Err(e) => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        endpoint,
                        error = %e,
                        attempt = attempt + 1,
                        ?delay,
                        "calendar unreachable, retrying"
                    );
                    delay
                }
            };
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn is_transient(status: StatusCode) -> bool {
    TRANSIENT_STATUSES.contains(&status)
}

fn retry_after(resp: &Response) -> Option<Duration> {
    resp.headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
