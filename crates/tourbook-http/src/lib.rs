//! Tourbook HTTP: infrastructure adapters for the analytics pipeline.
//!
//! Provides the `reqwest` delivery transport that posts batches to the
//! marketplace backend, and a file-backed device identity store.

pub mod device_id_file;
pub mod http_transport;
