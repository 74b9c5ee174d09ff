//! Engine configuration.

use std::time::Duration;

/// Tuning for the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum documents resolved concurrently by one reconciliation run.
    pub max_in_flight: usize,
    /// Bound on each attestation-network resolution call.
    pub resolve_timeout: Duration,
    /// Bound on each attestation-network submission call.
    pub submit_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 8,
            resolve_timeout: Duration::from_secs(30),
            submit_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `NOTARY_MAX_IN_FLIGHT` (default: 8, minimum 1)
    /// - `NOTARY_RESOLVE_TIMEOUT_SECS` (default: 30)
    /// - `NOTARY_SUBMIT_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(n) = env_u64("NOTARY_MAX_IN_FLIGHT")? {
            config.max_in_flight = usize::try_from(n)
                .map_err(|_| ConfigError::Invalid("NOTARY_MAX_IN_FLIGHT", n.to_string()))?;
        }
        if let Some(secs) = env_u64("NOTARY_RESOLVE_TIMEOUT_SECS")? {
            config.resolve_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("NOTARY_SUBMIT_TIMEOUT_SECS")? {
            config.submit_timeout = Duration::from_secs(secs);
        }
        config.validate()
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.max_in_flight == 0 {
            return Err(ConfigError::Invalid("NOTARY_MAX_IN_FLIGHT", "0".into()));
        }
        if self.resolve_timeout.is_zero() {
            return Err(ConfigError::Invalid("NOTARY_RESOLVE_TIMEOUT_SECS", "0".into()));
        }
        if self.submit_timeout.is_zero() {
            return Err(ConfigError::Invalid("NOTARY_SUBMIT_TIMEOUT_SECS", "0".into()));
        }
        Ok(self)
    }
}

fn env_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_in_flight, 8);
        assert_eq!(config.resolve_timeout, Duration::from_secs(30));
        assert_eq!(config.submit_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_in_flight_is_rejected() {
        let config = EngineConfig {
            max_in_flight: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid("NOTARY_MAX_IN_FLIGHT", _))
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = EngineConfig {
            resolve_timeout: Duration::ZERO,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
