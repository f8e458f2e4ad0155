//! `reqwest` implementation of the `EventTransport` trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::debug;

use tourbook_core::error::AnalyticsError;
use tourbook_core::event::AnalyticsEvent;
use tourbook_core::transport::{DEVICE_ID_HEADER, DeliveryReceipt, EVENTS_PATH, EventTransport};

/// Default per-request timeout enforced by the HTTP client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`HttpEventTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportConfig {
    /// Base URL of the marketplace API, e.g. `https://api.example.com/v1`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpTransportConfig {
    /// Settings for `base_url` with the default timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Serialize)]
struct BatchBody<'a> {
    events: &'a [AnalyticsEvent],
}

/// Posts batches as JSON to `{base_url}/analytics/events`.
#[derive(Debug, Clone)]
pub struct HttpEventTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEventTransport {
    /// Builds the transport and its HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Validation` if the base URL is blank and
    /// `AnalyticsError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &HttpTransportConfig) -> Result<Self, AnalyticsError> {
        let base = config.base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(AnalyticsError::Validation(
                "analytics base URL must not be empty".to_owned(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalyticsError::Internal(format!("http client init failed: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{base}{EVENTS_PATH}"),
        })
    }

    /// The full URL batches are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EventTransport for HttpEventTransport {
    async fn send(
        &self,
        device_id: &str,
        events: &[AnalyticsEvent],
    ) -> Result<DeliveryReceipt, AnalyticsError> {
        let body = serde_json::to_vec(&BatchBody { events })?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(DEVICE_ID_HEADER, device_id)
            .body(body)
            .send()
            .await
            .map_err(|e| AnalyticsError::Network(e.to_string()))?;

        let status = response.status();
        debug!(
            status = status.as_u16(),
            batch_size = events.len(),
            "analytics endpoint answered"
        );
        if status.is_success() {
            Ok(DeliveryReceipt {
                status: status.as_u16(),
            })
        } else {
            Err(AnalyticsError::Delivery {
                status: status.as_u16(),
            })
        }
    }
}
