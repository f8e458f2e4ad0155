//! Identifier generation.
//!
//! Device and session identifiers are random strings. Production code uses
//! UUIDs; tests inject a generator that yields a known sequence.

use uuid::Uuid;

/// Produces the random identifiers attached to analytics events.
pub trait IdGenerator: Send + Sync {
    /// A new long-lived device identifier.
    fn device_id(&self) -> String;

    /// A new per-process session identifier.
    fn session_id(&self) -> String;
}

/// UUID-backed generator: v4 for devices, time-ordered v7 for sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn device_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn session_id(&self) -> String {
        Uuid::now_v7().to_string()
    }
}
