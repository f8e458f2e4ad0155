//! Test stores: mock `DeviceIdStore` implementations for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tourbook_core::error::AnalyticsError;
use tourbook_core::storage::DeviceIdStore;

/// A store that keeps the identifier in memory and counts writes.
#[derive(Debug, Default)]
pub struct InMemoryDeviceIdStore {
    value: Mutex<Option<String>>,
    saves: AtomicUsize,
}

impl InMemoryDeviceIdStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `device_id`.
    #[must_use]
    pub fn with_value(device_id: &str) -> Self {
        Self {
            value: Mutex::new(Some(device_id.to_owned())),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl DeviceIdStore for InMemoryDeviceIdStore {
    fn load(&self) -> Result<Option<String>, AnalyticsError> {
        Ok(self.value.lock().unwrap().clone())
    }

    fn save(&self, device_id: &str) -> Result<(), AnalyticsError> {
        *self.value.lock().unwrap() = Some(device_id.to_owned());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A store whose reads and writes always fail. Useful for testing the
/// in-memory fallback.
#[derive(Debug)]
pub struct FailingDeviceIdStore;

impl DeviceIdStore for FailingDeviceIdStore {
    fn load(&self) -> Result<Option<String>, AnalyticsError> {
        Err(AnalyticsError::Storage("storage unavailable".into()))
    }

    fn save(&self, _device_id: &str) -> Result<(), AnalyticsError> {
        Err(AnalyticsError::Storage("storage unavailable".into()))
    }
}
