//! Durable storage seam for the device identifier.

use crate::error::AnalyticsError;

/// A durable key-value entry holding the device identifier.
pub trait DeviceIdStore: Send + Sync {
    /// Returns the stored identifier, or `None` if nothing usable is stored.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` if the store cannot be read.
    fn load(&self) -> Result<Option<String>, AnalyticsError>;

    /// Persists `device_id`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Storage` if the store cannot be written.
    fn save(&self, device_id: &str) -> Result<(), AnalyticsError>;
}
