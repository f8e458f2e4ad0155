//! Background flush scheduling.
//!
//! One task owns the periodic timer, listens for flush requests from the
//! tracker, and reacts to host lifecycle signals. Timer, request and
//! hidden triggers each spawn a flush and go back to waiting, so the
//! tracker's in-flight guard alone decides whether an attempt runs: a
//! trigger that lands while a flush is in flight is dropped, and the next
//! trigger picks up whatever was left behind.
//!
//! Spawned flushes are tracked. On unload the scheduler waits for them to
//! settle before its final attempt, so a batch that failed on the wire is
//! back in the queue when that attempt runs.

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tourbook_core::error::AnalyticsError;
use tracing::{debug, error, info};

use crate::application::tracker::{FlushTrigger, Tracker};

/// Host lifecycle transitions the scheduler reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// The host went to the background; flush what is pending.
    Hidden,
    /// The host came back to the foreground.
    Visible,
    /// The host is about to exit; make a final flush attempt and stop.
    Unload,
}

/// Spawns the background flush task for a [`Tracker`].
#[derive(Debug)]
pub struct FlushScheduler;

impl FlushScheduler {
    /// Starts the scheduler on the current tokio runtime.
    ///
    /// The first timer flush happens one `flush_interval` after start.
    #[must_use]
    pub fn spawn(tracker: Tracker) -> SchedulerHandle {
        let (signals, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(tracker, receiver));
        SchedulerHandle { signals, task }
    }
}

/// Control handle for a running scheduler.
///
/// Dropping the handle is treated like [`LifecycleSignal::Unload`].
#[derive(Debug)]
pub struct SchedulerHandle {
    signals: mpsc::UnboundedSender<LifecycleSignal>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Forwards a lifecycle signal. Returns `false` if the scheduler has
    /// already stopped.
    pub fn signal(&self, signal: LifecycleSignal) -> bool {
        self.signals.send(signal).is_ok()
    }

    /// Whether the background task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Sends [`LifecycleSignal::Unload`] and waits for the final flush
    /// attempt to settle.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Internal` if the background task panicked.
    pub async fn shutdown(self) -> Result<(), AnalyticsError> {
        // A closed channel means the task already stopped; joining is enough.
        let _ = self.signals.send(LifecycleSignal::Unload);
        self.task
            .await
            .map_err(|e| AnalyticsError::Internal(format!("flush scheduler task failed: {e}")))
    }
}

async fn run(tracker: Tracker, mut signals: mpsc::UnboundedReceiver<LifecycleSignal>) {
    let period = tracker.config().flush_interval;
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval = ?period, "analytics flush scheduler started");

    let mut flushes = JoinSet::new();
    loop {
        tokio::select! {
            _ = ticker.tick() => spawn_flush(&mut flushes, &tracker, FlushTrigger::Timer),
            () = tracker.flush_requested() => {
                spawn_flush(&mut flushes, &tracker, FlushTrigger::Requested);
            }
            Some(joined) = flushes.join_next(), if !flushes.is_empty() => log_join(joined),
            signal = signals.recv() => match signal {
                Some(LifecycleSignal::Hidden) => {
                    spawn_flush(&mut flushes, &tracker, FlushTrigger::Hidden);
                }
                Some(LifecycleSignal::Visible) => debug!("host visible"),
                Some(LifecycleSignal::Unload) | None => break,
            },
        }
    }

    if !flushes.is_empty() {
        debug!(in_flight = flushes.len(), "waiting for background flushes to settle");
    }
    while let Some(joined) = flushes.join_next().await {
        log_join(joined);
    }
    flush_logged(&tracker, FlushTrigger::Unload).await;

    info!(
        pending = tracker.pending_len().unwrap_or_default(),
        "analytics flush scheduler stopped"
    );
}

fn spawn_flush(flushes: &mut JoinSet<()>, tracker: &Tracker, trigger: FlushTrigger) {
    let tracker = tracker.clone();
    flushes.spawn(async move { flush_logged(&tracker, trigger).await });
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        error!(error = %err, "background analytics flush task failed");
    }
}

/// Background flushes log failures instead of propagating them.
async fn flush_logged(tracker: &Tracker, trigger: FlushTrigger) {
    match tracker.flush(trigger).await {
        Ok(outcome) => debug!(?outcome, %trigger, "background analytics flush settled"),
        Err(err) => error!(error = %err, %trigger, "background analytics flush failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tourbook_core::event::EventDraft;
    use tourbook_core::transport::EventTransport;
    use tourbook_test_support::{FixedClock, GatedTransport, RecordingTransport};

    use super::{FlushScheduler, LifecycleSignal};
    use crate::application::config::TrackerConfig;
    use crate::application::tracker::{TrackOptions, Tracker};

    const WAIT: Duration = Duration::from_secs(2);
    const NEVER: Duration = Duration::from_secs(3600);

    fn tracker_with(transport: Arc<dyn EventTransport>, flush_interval: Duration) -> Tracker {
        Tracker::new(
            TrackerConfig {
                flush_interval,
                ..TrackerConfig::default()
            },
            transport,
            Arc::new(FixedClock::default()),
            "device-1",
            "session-1",
        )
        .unwrap()
    }

    fn track(tracker: &Tracker, name: &str) {
        tracker
            .track_event(EventDraft::new(name), TrackOptions::default())
            .unwrap();
    }

    #[tokio::test]
    async fn test_immediate_event_flushes_without_waiting_for_timer() {
        // Arrange
        let transport = Arc::new(RecordingTransport::new());
        let tracker = tracker_with(transport.clone(), NEVER);
        let handle = FlushScheduler::spawn(tracker.clone());

        // Act
        tracker
            .track_event(EventDraft::new("booking_confirmed"), TrackOptions::immediate())
            .unwrap();

        // Assert
        tokio::time::timeout(WAIT, transport.wait_for_deliveries(1))
            .await
            .unwrap();
        let deliveries = transport.deliveries();
        assert_eq!(deliveries[0].events[0].event_name, "booking_confirmed");
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_crossing_threshold_flushes_pending_events_without_timer() {
        // Arrange
        let transport = Arc::new(RecordingTransport::new());
        let tracker = tracker_with(transport.clone(), NEVER);

        // Enqueue before the scheduler runs so the whole burst lands in one batch.
        for i in 0..25 {
            track(&tracker, &format!("event_{i}"));
        }

        // Act
        let handle = FlushScheduler::spawn(tracker.clone());

        // Assert
        tokio::time::timeout(WAIT, transport.wait_for_deliveries(1))
            .await
            .unwrap();
        let deliveries = transport.deliveries();
        assert_eq!(deliveries[0].events.len(), 25);
        assert_eq!(deliveries[0].events[0].event_name, "event_0");
        assert_eq!(deliveries[0].events[24].event_name, "event_24");
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_threshold_crossed_while_running_flushes_at_twentieth_event() {
        // Arrange
        let transport = Arc::new(RecordingTransport::new());
        let tracker = tracker_with(transport.clone(), NEVER);
        let handle = FlushScheduler::spawn(tracker.clone());
        for i in 0..19 {
            track(&tracker, &format!("event_{i}"));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.call_count(), 0);

        // Act
        track(&tracker, "event_19");

        // Assert
        tokio::time::timeout(WAIT, transport.wait_for_deliveries(1))
            .await
            .unwrap();
        let deliveries = transport.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].events.len(), 20);
        assert_eq!(deliveries[0].events[19].event_name, "event_19");
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_below_threshold_waits_for_timer() {
        // Arrange
        let transport = Arc::new(RecordingTransport::new());
        let tracker = tracker_with(transport.clone(), Duration::from_millis(50));
        let handle = FlushScheduler::spawn(tracker.clone());

        // Act
        track(&tracker, "tour_view");

        // Assert
        tokio::time::timeout(WAIT, transport.wait_for_deliveries(1))
            .await
            .unwrap();
        assert_eq!(tracker.pending_len().unwrap(), 0);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_hidden_signal_triggers_flush() {
        let transport = Arc::new(RecordingTransport::new());
        let tracker = tracker_with(transport.clone(), NEVER);
        let handle = FlushScheduler::spawn(tracker.clone());
        track(&tracker, "tour_view");

        assert!(handle.signal(LifecycleSignal::Hidden));

        tokio::time::timeout(WAIT, transport.wait_for_deliveries(1))
            .await
            .unwrap();
        assert!(!handle.is_finished());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_visible_signal_does_not_flush() {
        let transport = Arc::new(RecordingTransport::new());
        let tracker = tracker_with(transport.clone(), NEVER);
        let handle = FlushScheduler::spawn(tracker.clone());
        track(&tracker, "tour_view");

        assert!(handle.signal(LifecycleSignal::Visible));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(transport.call_count(), 0);
        assert_eq!(tracker.pending_len().unwrap(), 1);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_makes_final_flush_attempt() {
        // Arrange
        let transport = Arc::new(RecordingTransport::new());
        let tracker = tracker_with(transport.clone(), NEVER);
        let handle = FlushScheduler::spawn(tracker.clone());
        track(&tracker, "checkout_abandoned");

        // Act
        handle.shutdown().await.unwrap();

        // Assert
        assert_eq!(transport.call_count(), 1);
        assert_eq!(tracker.pending_len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_scheduler_after_final_flush() {
        let transport = Arc::new(RecordingTransport::new());
        let tracker = tracker_with(transport.clone(), NEVER);
        let handle = FlushScheduler::spawn(tracker.clone());
        track(&tracker, "tour_view");

        drop(handle);

        tokio::time::timeout(WAIT, transport.wait_for_deliveries(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_trigger_during_in_flight_flush_sends_nothing_extra() {
        // Arrange
        let transport = Arc::new(GatedTransport::succeeding());
        let tracker = tracker_with(transport.clone(), NEVER);
        let handle = FlushScheduler::spawn(tracker.clone());
        tracker
            .track_event(EventDraft::new("first"), TrackOptions::immediate())
            .unwrap();
        tokio::time::timeout(WAIT, transport.wait_until_entered(1))
            .await
            .unwrap();

        // Act
        assert!(handle.signal(LifecycleSignal::Hidden));
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Assert
        assert_eq!(transport.call_count(), 1);
        transport.release();
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_flush_before_final_attempt() {
        // Arrange
        let transport = Arc::new(GatedTransport::failing());
        let tracker = tracker_with(transport.clone(), NEVER);
        let handle = FlushScheduler::spawn(tracker.clone());
        tracker
            .track_event(EventDraft::new("checkout_started"), TrackOptions::immediate())
            .unwrap();
        tokio::time::timeout(WAIT, transport.wait_until_entered(1))
            .await
            .unwrap();

        // Act
        let shutdown = tokio::spawn(handle.shutdown());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!shutdown.is_finished());
        transport.release();
        transport.release();

        // Assert
        tokio::time::timeout(WAIT, shutdown)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(transport.call_count(), 2);
        assert!(!tracker.is_flushing());
        assert_eq!(tracker.pending_len().unwrap(), 1);
    }
}
