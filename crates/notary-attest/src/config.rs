//! Calendar client configuration.
//!
//! The binary fills this from `NOTARY_CALENDAR_URL`,
//! `NOTARY_CALENDAR_TOKEN` and `NOTARY_CALENDAR_TIMEOUT_SECS` (or the
//! matching flags); tests construct it directly.

use url::Url;

/// Configuration for connecting to a calendar server.
///
/// Custom `Debug` implementation redacts the `api_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct CalendarConfig {
    /// Base URL of the calendar.
    pub url: Url,
    /// Optional bearer token.
    pub api_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for CalendarConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarConfig")
            .field("url", &self.url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl CalendarConfig {
    /// Configuration for a calendar at `url` with defaults.
    pub fn new(url: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(url).map_err(|e| ConfigError::InvalidUrl(url.to_string(), e.to_string()))?;
        Ok(Self {
            url,
            api_token: None,
            timeout_secs: 30,
        })
    }

    /// Set the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("a calendar URL is required (NOTARY_CALENDAR_URL or --calendar-url)")]
    MissingUrl,
    #[error("invalid URL {0:?}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid bearer token")]
    InvalidToken,
}
