//! In-memory event buffering and device identity.

pub mod identity;
pub mod queue;
