//! Tourbook analytics agent.
//!
//! Wires the analytics pipeline to real infrastructure and feeds it
//! interaction events read as newline-delimited JSON.

pub mod agent;
pub mod config;
pub mod error;
pub mod input;
