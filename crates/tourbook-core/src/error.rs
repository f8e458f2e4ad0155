//! Analytics error types.

use thiserror::Error;

/// Top-level error type for the analytics pipeline.
///
/// Delivery failures (`Delivery`, `Network`) are recovered by requeueing and
/// never reach callers of `flush_queue`; they exist so transports can report
/// why an attempt failed.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// An event or configuration value failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The backend answered with a non-success status.
    #[error("delivery rejected with status {status}")]
    Delivery {
        /// HTTP status code returned by the backend.
        status: u16,
    },

    /// The request never produced a response (connect, timeout, TLS, ...).
    #[error("network error: {0}")]
    Network(String),

    /// A batch could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Durable device identity storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal bookkeeping failed (e.g. a poisoned queue lock).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AnalyticsError {
    /// Whether this error describes a failed delivery attempt, as opposed to
    /// a local failure.
    #[must_use]
    pub fn is_delivery_failure(&self) -> bool {
        matches!(self, Self::Delivery { .. } | Self::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_and_network_errors_are_delivery_failures() {
        assert!(AnalyticsError::Delivery { status: 503 }.is_delivery_failure());
        assert!(AnalyticsError::Network("connection refused".into()).is_delivery_failure());
    }

    #[test]
    fn test_local_errors_are_not_delivery_failures() {
        assert!(!AnalyticsError::Storage("read-only".into()).is_delivery_failure());
        assert!(!AnalyticsError::Internal("poisoned".into()).is_delivery_failure());
    }

    #[test]
    fn test_delivery_error_message_includes_status() {
        let err = AnalyticsError::Delivery { status: 502 };
        assert_eq!(err.to_string(), "delivery rejected with status 502");
    }
}
