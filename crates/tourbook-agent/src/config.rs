//! Agent configuration read from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use tourbook_analytics::TrackerConfig;
use tourbook_http::http_transport::{DEFAULT_TIMEOUT, HttpTransportConfig};

use crate::error::AppError;

/// Default location of the device identifier file.
pub const DEFAULT_DEVICE_ID_PATH: &str = ".tourbook/device_id.json";

/// Everything the agent needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Batching and scheduling.
    pub tracker: TrackerConfig,
    /// Backend connection.
    pub transport: HttpTransportConfig,
    /// Where the device identifier is persisted.
    pub device_id_path: PathBuf,
}

impl AgentConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// numeric variable does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// numeric variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let base_url = lookup("ANALYTICS_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("ANALYTICS_API_BASE_URL environment variable must be set".into())
            })?;

        let defaults = TrackerConfig::default();
        let max_batch_size =
            parse_or(&lookup, "ANALYTICS_MAX_BATCH_SIZE", defaults.max_batch_size)?;
        let flush_threshold =
            parse_or(&lookup, "ANALYTICS_FLUSH_THRESHOLD", defaults.flush_threshold)?;
        let flush_interval =
            millis_or(&lookup, "ANALYTICS_FLUSH_INTERVAL_MS", defaults.flush_interval)?;
        let tracker = TrackerConfig {
            max_batch_size,
            flush_threshold,
            flush_interval,
            ..defaults
        };
        tracker
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let transport = HttpTransportConfig {
            base_url,
            timeout: millis_or(&lookup, "ANALYTICS_HTTP_TIMEOUT_MS", DEFAULT_TIMEOUT)?,
        };

        let device_id_path = lookup("ANALYTICS_DEVICE_ID_PATH")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DEVICE_ID_PATH), PathBuf::from);

        Ok(Self {
            tracker,
            transport,
            device_id_path,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} must be a valid number: {e}"))),
        None => Ok(default),
    }
}

fn millis_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, AppError> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_or(lookup, key, default_ms).map(Duration::from_millis)
}
