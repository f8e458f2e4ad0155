//! Tracker façade, flush scheduling and configuration.

pub mod config;
pub mod scheduler;
pub mod tracker;
