//! Tourbook agent: error types.

use thiserror::Error;
use tourbook_core::error::AnalyticsError;

/// Startup and runtime errors for the agent.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading input failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The analytics pipeline reported an unexpected failure.
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}
