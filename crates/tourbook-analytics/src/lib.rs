//! Tourbook: client-side analytics pipeline.
//!
//! UI code records interactions through a [`Tracker`]; events are buffered
//! in memory and delivered in batches by a background [`FlushScheduler`].
//! Delivery is best-effort: failed batches are retried on the next trigger
//! and anything still queued when the process exits is lost.

pub mod application;
pub mod domain;

pub use application::config::TrackerConfig;
pub use application::scheduler::{FlushScheduler, LifecycleSignal, SchedulerHandle};
pub use application::tracker::{FlushOutcome, FlushTrigger, TrackOptions, TrackOutcome, Tracker};
pub use domain::identity::DeviceIdentity;
pub use domain::queue::EventQueue;
