//! # Service Wiring
//!
//! Builds a [`NotaryService`] for one CLI invocation from flags and
//! environment:
//!
//! - Calendar: `--calendar-url` / `NOTARY_CALENDAR_URL` (required for
//!   every command except `digest`), optional bearer token and timeout.
//! - Records: PostgreSQL when `--database-url` / `DATABASE_URL` is set,
//!   otherwise JSON files under `{data_dir}/records`.
//! - Blobs: always `{data_dir}/blobs`.
//! - Engine tuning: `NOTARY_MAX_IN_FLIGHT`, `NOTARY_RESOLVE_TIMEOUT_SECS`,
//!   `NOTARY_SUBMIT_TIMEOUT_SECS`; `--max-in-flight` overrides.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use notary_attest::{AttestationNetwork, CalendarClient, CalendarConfig, ConfigError};
use notary_engine::{EngineConfig, NotaryService};
use notary_store::{BlobStore, FsBlobStore, FsRecordStore, PgRecordStore, RecordStore};

/// Global options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Local state directory for records and blobs.
    #[arg(long, global = true, env = "NOTARY_DATA_DIR", default_value = ".notary")]
    pub data_dir: PathBuf,

    /// Base URL of the calendar server.
    #[arg(long, global = true, env = "NOTARY_CALENDAR_URL")]
    pub calendar_url: Option<String>,

    /// Bearer token for the calendar server.
    #[arg(long, global = true, env = "NOTARY_CALENDAR_TOKEN", hide_env_values = true)]
    pub calendar_token: Option<String>,

    /// HTTP timeout for calendar requests, in seconds.
    #[arg(long, global = true, env = "NOTARY_CALENDAR_TIMEOUT_SECS", default_value_t = 30)]
    pub calendar_timeout_secs: u64,

    /// PostgreSQL URL for the record store.
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Maximum documents resolved concurrently during reconciliation.
    #[arg(long, global = true)]
    pub max_in_flight: Option<usize>,
}

impl ServiceArgs {
    /// Defaults rooted at `data_dir`, talking to `calendar_url`.
    pub fn local(data_dir: impl Into<PathBuf>, calendar_url: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            calendar_url: Some(calendar_url.into()),
            calendar_token: None,
            calendar_timeout_secs: 30,
            database_url: None,
            max_in_flight: None,
        }
    }

    fn calendar_config(&self) -> Result<CalendarConfig, ConfigError> {
        let url = self.calendar_url.as_deref().ok_or(ConfigError::MissingUrl)?;
        let mut config = CalendarConfig::new(url)?;
        config.timeout_secs = self.calendar_timeout_secs;
        match self.calendar_token.as_deref() {
            Some(token) if !token.is_empty() => Ok(config.with_token(token)),
            _ => Ok(config),
        }
    }
}

/// Wire up the notary service.
pub async fn build_service(args: &ServiceArgs) -> Result<NotaryService> {
    let calendar = args.calendar_config()?;
    tracing::debug!(?calendar, "calendar configuration");
    let network: Arc<dyn AttestationNetwork> =
        Arc::new(CalendarClient::new(calendar).context("failed to build calendar client")?);

    let mut engine = EngineConfig::from_env()?;
    if let Some(n) = args.max_in_flight {
        engine.max_in_flight = n;
    }
    let engine = engine.validate()?;

    let records: Arc<dyn RecordStore> = match args.database_url.as_deref() {
        Some(url) => {
            let pool = notary_store::connect(url)
                .await
                .context("failed to connect to PostgreSQL")?;
            Arc::new(PgRecordStore::new(pool))
        }
        None => {
            let dir = args.data_dir.join("records");
            tracing::debug!(dir = %dir.display(), "using filesystem record store");
            Arc::new(
                FsRecordStore::open(&dir)
                    .with_context(|| format!("failed to open record store at {}", dir.display()))?,
            )
        }
    };
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(args.data_dir.join("blobs")));

    Ok(NotaryService::new(network, records, blobs, &engine))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_calendar_url_is_reported() {
        let mut args = ServiceArgs::local(".notary", "https://calendar.test");
        args.calendar_url = None;
        assert!(matches!(args.calendar_config(), Err(ConfigError::MissingUrl)));
    }

    #[test]
    fn empty_token_is_ignored() {
        let mut args = ServiceArgs::local(".notary", "https://calendar.test");
        args.calendar_token = Some(String::new());
        assert!(args.calendar_config().unwrap().api_token.is_none());

        args.calendar_token = Some("t0ken".into());
        assert_eq!(args.calendar_config().unwrap().api_token.as_deref(), Some("t0ken"));
    }

    #[test]
    fn timeout_flag_is_applied() {
        let mut args = ServiceArgs::local(".notary", "https://calendar.test");
        args.calendar_timeout_secs = 5;
        assert_eq!(args.calendar_config().unwrap().timeout_secs, 5);
    }
}
