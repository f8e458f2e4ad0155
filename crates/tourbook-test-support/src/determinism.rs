//! Deterministic time and identifier sources for pipeline tests.
//!
//! Events built in tests are stamped by [`FixedClock`] and tagged with ids
//! from [`SequenceIdGenerator`], so assertions can name exact values.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use tourbook_core::clock::Clock;
use tourbook_core::id::IdGenerator;

/// Stamps every event with the same instant.
///
/// The default instant is `2026-01-15T10:00:00Z`.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).single().unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Issues `device-1`, `device-2`, ... and `session-1`, `session-2`, ...
#[derive(Debug, Default)]
pub struct SequenceIdGenerator {
    devices: AtomicUsize,
    sessions: AtomicUsize,
}

impl SequenceIdGenerator {
    /// Create a generator whose first identifiers end in `1`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many device identifiers have been handed out.
    pub fn device_ids_issued(&self) -> usize {
        self.devices.load(Ordering::SeqCst)
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn device_id(&self) -> String {
        let n = self.devices.fetch_add(1, Ordering::SeqCst) + 1;
        format!("device-{n}")
    }

    fn session_id(&self) -> String {
        let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        format!("session-{n}")
    }
}
