//! Shared test doubles for the Tourbook analytics pipeline.

mod determinism;
mod storage;
mod transport;

pub use determinism::{FixedClock, SequenceIdGenerator};
pub use storage::{FailingDeviceIdStore, InMemoryDeviceIdStore};
pub use transport::{FailingTransport, GatedTransport, RecordedDelivery, RecordingTransport};
