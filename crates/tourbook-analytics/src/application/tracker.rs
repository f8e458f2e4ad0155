//! Consumer-facing tracker: enqueue events and flush them to the backend.
//!
//! A `Tracker` is created once at startup and cloned into whatever needs to
//! record interactions. Queue operations are synchronous; the only await
//! point is the transport call inside [`Tracker::flush_queue`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tourbook_core::clock::Clock;
use tourbook_core::error::AnalyticsError;
use tourbook_core::event::{AnalyticsEvent, EventDefaults, EventDraft};
use tourbook_core::transport::EventTransport;
use tracing::{debug, error, info, warn};

use crate::application::config::TrackerConfig;
use crate::domain::queue::EventQueue;

/// Per-call options for [`Tracker::track_event`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackOptions {
    /// Request a flush right away instead of waiting for batching.
    pub immediate: bool,
}

impl TrackOptions {
    /// Options for an event that should be flushed right away.
    #[must_use]
    pub fn immediate() -> Self {
        Self { immediate: true }
    }
}

/// What happened to a tracked event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The event was appended to the queue.
    Queued {
        /// Queue length after the append.
        pending: usize,
        /// Whether a flush was requested because of this event.
        flush_requested: bool,
    },
    /// The event had no usable name and was discarded.
    Dropped,
}

/// Result of one flush attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Another flush was already in flight; nothing was done.
    InFlight,
    /// The queue was empty.
    Empty,
    /// The batch was accepted by the backend and discarded locally.
    Delivered {
        /// Number of events delivered.
        batch_size: usize,
        /// Status the backend answered with.
        status: u16,
    },
    /// Delivery failed; the batch was put back at the head of the queue.
    Failed {
        /// Number of events requeued.
        batch_size: usize,
        /// Why the attempt failed.
        reason: String,
    },
}

/// What caused a flush attempt. Recorded in logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// A caller invoked `flush_queue`.
    Manual,
    /// The queue reached the flush threshold or an immediate event arrived.
    Requested,
    /// The periodic timer fired.
    Timer,
    /// The host became hidden.
    Hidden,
    /// The host is about to unload.
    Unload,
}

impl FlushTrigger {
    /// Stable lowercase name used as a log field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Requested => "requested",
            Self::Timer => "timer",
            Self::Hidden => "hidden",
            Self::Unload => "unload",
        }
    }
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct TrackerInner {
    config: TrackerConfig,
    queue: Mutex<EventQueue>,
    in_flight: AtomicBool,
    consecutive_failures: AtomicU32,
    flush_requested: Notify,
    transport: Arc<dyn EventTransport>,
    clock: Arc<dyn Clock>,
    device_id: String,
    session_id: String,
}

/// Handle to the process-wide analytics queue.
///
/// Cloning is cheap; all clones share one queue and one in-flight guard.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

impl Tracker {
    /// Creates a tracker that stamps events with `device_id` and `session_id`
    /// and delivers them through `transport`.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Validation` if `config` is invalid or either
    /// identifier is blank.
    pub fn new(
        config: TrackerConfig,
        transport: Arc<dyn EventTransport>,
        clock: Arc<dyn Clock>,
        device_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Result<Self, AnalyticsError> {
        config.validate()?;
        let device_id = device_id.into();
        let session_id = session_id.into();
        if device_id.trim().is_empty() || session_id.trim().is_empty() {
            return Err(AnalyticsError::Validation(
                "device_id and session_id must not be blank".to_owned(),
            ));
        }

        Ok(Self {
            inner: Arc::new(TrackerInner {
                config,
                queue: Mutex::new(EventQueue::new()),
                in_flight: AtomicBool::new(false),
                consecutive_failures: AtomicU32::new(0),
                flush_requested: Notify::new(),
                transport,
                clock,
                device_id,
                session_id,
            }),
        })
    }

    /// Records an interaction.
    ///
    /// Events without a usable name are dropped silently. Reaching the flush
    /// threshold, or passing [`TrackOptions::immediate`], requests a flush
    /// from the running [`FlushScheduler`](super::scheduler::FlushScheduler).
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Internal` if the queue lock is poisoned.
    pub fn track_event(
        &self,
        draft: EventDraft,
        options: TrackOptions,
    ) -> Result<TrackOutcome, AnalyticsError> {
        let defaults = EventDefaults {
            now: self.inner.clock.now(),
            device_id: &self.inner.device_id,
            session_id: &self.inner.session_id,
        };

        let pending = match self.lock_queue()?.enqueue(draft, &defaults) {
            Ok(pending) => pending,
            Err(err) => {
                debug!(reason = %err, "dropping analytics event");
                return Ok(TrackOutcome::Dropped);
            }
        };

        let flush_requested = options.immediate || pending >= self.inner.config.flush_threshold;
        if flush_requested {
            debug!(pending, immediate = options.immediate, "requesting analytics flush");
            self.inner.flush_requested.notify_one();
        }

        Ok(TrackOutcome::Queued {
            pending,
            flush_requested,
        })
    }

    /// Attempts to deliver one batch and waits for the attempt to settle.
    ///
    /// Delivery failures resolve `Ok(FlushOutcome::Failed)` after requeueing.
    /// A call made while another flush is in flight returns
    /// `Ok(FlushOutcome::InFlight)` without touching the queue.
    ///
    /// # Errors
    ///
    /// Returns an error only for local failures: a poisoned queue lock, or a
    /// transport error that is not a delivery failure (the batch is still
    /// requeued first).
    pub async fn flush_queue(&self) -> Result<FlushOutcome, AnalyticsError> {
        self.flush(FlushTrigger::Manual).await
    }

    pub(crate) async fn flush(
        &self,
        trigger: FlushTrigger,
    ) -> Result<FlushOutcome, AnalyticsError> {
        let Some(_guard) = InFlightGuard::acquire(&self.inner.in_flight) else {
            debug!(%trigger, "analytics flush already in flight; skipping");
            return Ok(FlushOutcome::InFlight);
        };

        let batch = self.lock_queue()?.take_batch(self.inner.config.max_batch_size);
        if batch.is_empty() {
            return Ok(FlushOutcome::Empty);
        }
        let batch_size = batch.len();

        let result = self
            .inner
            .transport
            .send(&self.inner.device_id, &batch)
            .await;

        match result {
            Ok(receipt) => {
                self.inner.consecutive_failures.store(0, Ordering::Relaxed);
                info!(batch_size, status = receipt.status, %trigger, "analytics batch delivered");
                Ok(FlushOutcome::Delivered {
                    batch_size,
                    status: receipt.status,
                })
            }
            Err(err) => {
                let pending = {
                    let mut queue = self.lock_queue()?;
                    queue.requeue_front(batch);
                    queue.len()
                };
                if !err.is_delivery_failure() {
                    error!(
                        batch_size,
                        error = %err,
                        %trigger,
                        "analytics flush failed unexpectedly"
                    );
                    return Err(err);
                }
                warn!(
                    batch_size,
                    pending,
                    reason = %err,
                    %trigger,
                    "analytics batch delivery failed; requeued"
                );
                self.note_failure();
                Ok(FlushOutcome::Failed {
                    batch_size,
                    reason: err.to_string(),
                })
            }
        }
    }

    fn note_failure(&self) {
        let failures = self
            .inner
            .consecutive_failures
            .fetch_add(1, Ordering::Relaxed)
            .saturating_add(1);
        let every = self.inner.config.failure_warning_threshold;
        if failures % every == 0 {
            // Retries are unbounded and have no backoff.
            warn!(
                consecutive_failures = failures,
                "analytics backend keeps rejecting deliveries; the same batch is being retried"
            );
        }
    }

    /// Number of events waiting for delivery.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Internal` if the queue lock is poisoned.
    pub fn pending_len(&self) -> Result<usize, AnalyticsError> {
        Ok(self.lock_queue()?.len())
    }

    /// Copy of the events waiting for delivery, head first.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Internal` if the queue lock is poisoned.
    pub fn pending_events(&self) -> Result<Vec<AnalyticsEvent>, AnalyticsError> {
        Ok(self.lock_queue()?.snapshot())
    }

    /// Whether a flush is currently awaiting the transport.
    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Consecutive failed deliveries since the last success.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Device identifier stamped on events and sent with every batch.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.inner.device_id
    }

    /// Session identifier stamped on events.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// The configuration this tracker was built with.
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    /// Resolves when `track_event` requests a flush. A request made while
    /// nobody is waiting is kept until the next call.
    pub(crate) fn flush_requested(&self) -> Notified<'_> {
        self.inner.flush_requested.notified()
    }

    fn lock_queue(&self) -> Result<MutexGuard<'_, EventQueue>, AnalyticsError> {
        self.inner
            .queue
            .lock()
            .map_err(|_| AnalyticsError::Internal("analytics queue lock poisoned".to_owned()))
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("config", &self.inner.config)
            .field("device_id", &self.inner.device_id)
            .field("session_id", &self.inner.session_id)
            .field("flushing", &self.is_flushing())
            .finish_non_exhaustive()
    }
}

/// Single-flight guard: held for the duration of one flush.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
