//! Test transports: mock `EventTransport` implementations for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};
use tourbook_core::error::AnalyticsError;
use tourbook_core::event::AnalyticsEvent;
use tourbook_core::transport::{DeliveryReceipt, EventTransport};

/// One call made to a recording transport.
#[derive(Debug, Clone)]
pub struct RecordedDelivery {
    /// Device identifier the batch was sent for.
    pub device_id: String,
    /// The batch, in the order it was sent.
    pub events: Vec<AnalyticsEvent>,
}

/// A transport that records every successful delivery and answers `202`.
///
/// `fail_next` makes the following calls fail with a network error instead;
/// failed calls are not recorded as deliveries.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    deliveries: Mutex<Vec<RecordedDelivery>>,
    failures_remaining: AtomicUsize,
    delivered: Notify,
}

impl RecordingTransport {
    /// Create a transport that accepts every batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls fail.
    pub fn fail_next(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Returns a snapshot of all successful deliveries.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Number of successful deliveries.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn call_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    /// Resolves once at least `count` deliveries have been recorded.
    pub async fn wait_for_deliveries(&self, count: usize) {
        loop {
            let delivered = self.delivered.notified();
            if self.call_count() >= count {
                return;
            }
            delivered.await;
        }
    }
}

#[async_trait]
impl EventTransport for RecordingTransport {
    async fn send(
        &self,
        device_id: &str,
        events: &[AnalyticsEvent],
    ) -> Result<DeliveryReceipt, AnalyticsError> {
        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(AnalyticsError::Network("connection refused".into()));
        }

        self.deliveries.lock().unwrap().push(RecordedDelivery {
            device_id: device_id.to_owned(),
            events: events.to_vec(),
        });
        self.delivered.notify_waiters();
        Ok(DeliveryReceipt { status: 202 })
    }
}

/// A transport that always fails, either with a network error or with a
/// fixed non-success status. Counts attempts.
#[derive(Debug)]
pub struct FailingTransport {
    status: Option<u16>,
    attempts: AtomicUsize,
}

impl FailingTransport {
    /// Fail every call as if the backend were unreachable.
    #[must_use]
    pub fn network() -> Self {
        Self {
            status: None,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Fail every call with the given HTTP status.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            status: Some(status),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Number of `send` calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventTransport for FailingTransport {
    async fn send(
        &self,
        _device_id: &str,
        _events: &[AnalyticsEvent],
    ) -> Result<DeliveryReceipt, AnalyticsError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.status {
            Some(status) => Err(AnalyticsError::Delivery { status }),
            None => Err(AnalyticsError::Network("connection refused".into())),
        }
    }
}

/// A transport that parks every call until the test calls `release`, then
/// succeeds or fails as configured. Used to hold a flush in flight.
#[derive(Debug)]
pub struct GatedTransport {
    succeed: bool,
    gate: Semaphore,
    calls: AtomicUsize,
    entered: Notify,
}

impl GatedTransport {
    /// Calls answer `202` once released.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::with_outcome(true)
    }

    /// Calls fail with a network error once released.
    #[must_use]
    pub fn failing() -> Self {
        Self::with_outcome(false)
    }

    fn with_outcome(succeed: bool) -> Self {
        Self {
            succeed,
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
        }
    }

    /// Let one parked (or future) call proceed.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    /// Number of calls that have entered `send`.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Resolves once at least `count` calls have entered `send`.
    pub async fn wait_until_entered(&self, count: usize) {
        loop {
            let entered = self.entered.notified();
            if self.call_count() >= count {
                return;
            }
            entered.await;
        }
    }
}

#[async_trait]
impl EventTransport for GatedTransport {
    async fn send(
        &self,
        _device_id: &str,
        _events: &[AnalyticsEvent],
    ) -> Result<DeliveryReceipt, AnalyticsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_waiters();

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| AnalyticsError::Internal(e.to_string()))?;
        permit.forget();

        if self.succeed {
            Ok(DeliveryReceipt { status: 202 })
        } else {
            Err(AnalyticsError::Network("gateway timeout".into()))
        }
    }
}
