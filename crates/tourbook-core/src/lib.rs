//! Tourbook Core: shared analytics abstractions.
//!
//! This crate defines the event model and the seams (clock, identifier
//! generation, delivery transport, device identity storage) that the
//! analytics pipeline is written against. It contains no infrastructure code.

pub mod clock;
pub mod error;
pub mod event;
pub mod id;
pub mod storage;
pub mod transport;
