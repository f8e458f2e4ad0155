//! Agent wiring: builds the pipeline and feeds it input lines.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tourbook_analytics::{
    DeviceIdentity, FlushScheduler, LifecycleSignal, SchedulerHandle, TrackOptions, TrackOutcome,
    Tracker,
};
use tourbook_core::clock::SystemClock;
use tourbook_core::id::{IdGenerator, UuidGenerator};
use tourbook_http::device_id_file::FileDeviceIdStore;
use tourbook_http::http_transport::HttpEventTransport;
use tracing::{info, warn};

use crate::config::AgentConfig;
use crate::error::AppError;
use crate::input::InputLine;

/// Counters describing one pass over the input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeStats {
    /// Events accepted into the queue.
    pub tracked: usize,
    /// Events dropped for lacking a usable name.
    pub dropped: usize,
    /// Lines that were not valid input.
    pub malformed: usize,
    /// Lifecycle lines seen.
    pub signals: usize,
}

/// A running tracker plus its background scheduler.
#[derive(Debug)]
pub struct Agent {
    tracker: Tracker,
    scheduler: SchedulerHandle,
}

impl Agent {
    /// Builds the production pipeline from `config` and starts the scheduler.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Analytics` if the transport or tracker cannot be
    /// built.
    pub fn start(config: &AgentConfig) -> Result<Self, AppError> {
        let ids: Arc<dyn IdGenerator> = Arc::new(UuidGenerator);
        let identity = DeviceIdentity::new(
            Arc::new(FileDeviceIdStore::new(&config.device_id_path)),
            Arc::clone(&ids),
        );
        let transport = HttpEventTransport::new(&config.transport)?;
        info!(endpoint = transport.endpoint(), "analytics transport ready");

        let tracker = Tracker::new(
            config.tracker.clone(),
            Arc::new(transport),
            Arc::new(SystemClock),
            identity.device_id(),
            ids.session_id(),
        )?;
        info!(
            device_id = tracker.device_id(),
            session_id = tracker.session_id(),
            "analytics tracker started"
        );

        Ok(Self::with_tracker(tracker))
    }

    /// Starts a scheduler for an already-built tracker.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn with_tracker(tracker: Tracker) -> Self {
        let scheduler = FlushScheduler::spawn(tracker.clone());
        Self { tracker, scheduler }
    }

    /// The tracker events are recorded on.
    #[must_use]
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Reads lines until end of input or an `unload` line.
    ///
    /// Malformed lines, including lines that are not UTF-8, are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if reading fails and `AppError::Analytics` if
    /// the tracker reports an unexpected failure.
    pub async fn consume<R: AsyncBufRead + Unpin>(
        &self,
        mut reader: R,
    ) -> Result<ConsumeStats, AppError> {
        let mut stats = ConsumeStats::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim_end_matches(['\n', '\r']),
                Err(err) => {
                    stats.malformed += 1;
                    warn!(error = %err, "skipping input line that is not UTF-8");
                    continue;
                }
            };

            match InputLine::parse(line) {
                Ok(None) => {}
                Ok(Some(InputLine::Event { draft, immediate })) => {
                    match self.tracker.track_event(draft, TrackOptions { immediate })? {
                        TrackOutcome::Queued { .. } => stats.tracked += 1,
                        TrackOutcome::Dropped => stats.dropped += 1,
                    }
                }
                Ok(Some(InputLine::Lifecycle { lifecycle })) => {
                    stats.signals += 1;
                    let signal = LifecycleSignal::from(lifecycle);
                    if signal == LifecycleSignal::Unload {
                        info!("unload requested on input");
                        break;
                    }
                    self.scheduler.signal(signal);
                }
                Err(err) => {
                    stats.malformed += 1;
                    warn!(error = %err, "skipping malformed input line");
                }
            }
        }

        Ok(stats)
    }

    /// Stops the scheduler after a final flush attempt. Returns how many
    /// events were left undelivered; those are lost.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Analytics` if the scheduler task failed.
    pub async fn shutdown(self) -> Result<usize, AppError> {
        self.scheduler.shutdown().await?;
        let pending = self.tracker.pending_len()?;
        if pending > 0 {
            warn!(pending, "exiting with undelivered analytics events");
        }
        Ok(pending)
    }
}
