//! Tracker configuration.

use std::time::Duration;

use tourbook_core::error::AnalyticsError;

/// Largest number of events sent in one delivery attempt.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

/// Queue length at which a flush is requested without waiting for the timer.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 20;

/// Period of the background flush timer.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Consecutive failed deliveries after which a warning is logged.
pub const DEFAULT_FAILURE_WARNING_THRESHOLD: u32 = 3;

/// Batching and scheduling parameters for a [`Tracker`](super::tracker::Tracker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Maximum events per delivery attempt.
    pub max_batch_size: usize,
    /// Pending-event count that requests an early flush.
    pub flush_threshold: usize,
    /// Period of the background timer.
    pub flush_interval: Duration,
    /// Consecutive failures before (and between) persistent-failure warnings.
    pub failure_warning_threshold: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            failure_warning_threshold: DEFAULT_FAILURE_WARNING_THRESHOLD,
        }
    }
}

impl TrackerConfig {
    /// Checks that every limit is usable.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Validation` naming the first zero-valued field.
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.max_batch_size == 0 {
            return Err(AnalyticsError::Validation(
                "max_batch_size must be at least 1".to_owned(),
            ));
        }
        if self.flush_threshold == 0 {
            return Err(AnalyticsError::Validation(
                "flush_threshold must be at least 1".to_owned(),
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(AnalyticsError::Validation(
                "flush_interval must be non-zero".to_owned(),
            ));
        }
        if self.failure_warning_threshold == 0 {
            return Err(AnalyticsError::Validation(
                "failure_warning_threshold must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}
