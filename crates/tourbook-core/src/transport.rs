//! Delivery transport abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::event::AnalyticsEvent;

/// Path of the batch ingestion endpoint, relative to the API base URL.
pub const EVENTS_PATH: &str = "/analytics/events";

/// Header carrying the sender's device identifier.
pub const DEVICE_ID_HEADER: &str = "X-Device-Id";

/// JSON body of a batch delivery: `{ "events": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBatch {
    /// Events in queue order.
    pub events: Vec<AnalyticsEvent>,
}

/// Proof of a successful delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// The 2xx status the backend answered with.
    pub status: u16,
}

/// Sends one batch of events to the analytics backend.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Deliver `events` on behalf of `device_id`.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Delivery` for non-2xx answers and
    /// `AnalyticsError::Network` when no answer arrived. Either way the
    /// caller treats the whole batch as undelivered.
    async fn send(
        &self,
        device_id: &str,
        events: &[AnalyticsEvent],
    ) -> Result<DeliveryReceipt, AnalyticsError>;
}
