//! Long-lived device identity with read-or-create semantics.

use std::sync::{Arc, OnceLock};

use tourbook_core::id::IdGenerator;
use tourbook_core::storage::DeviceIdStore;
use tracing::{debug, warn};

/// Resolves the device identifier once and memoizes it.
///
/// A stored identifier is reused for as long as storage stays intact. When
/// nothing is stored a fresh one is generated and persisted. If storage is
/// unusable the generated identifier is kept in memory for the life of this
/// value, so callers always see one stable string.
pub struct DeviceIdentity {
    store: Arc<dyn DeviceIdStore>,
    ids: Arc<dyn IdGenerator>,
    resolved: OnceLock<String>,
}

impl DeviceIdentity {
    /// Creates an unresolved identity backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DeviceIdStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            store,
            ids,
            resolved: OnceLock::new(),
        }
    }

    /// Returns the device identifier, reading or creating it on first use.
    pub fn device_id(&self) -> &str {
        self.resolved.get_or_init(|| self.read_or_create())
    }

    fn read_or_create(&self) -> String {
        match self.store.load() {
            Ok(Some(existing)) if !existing.trim().is_empty() => {
                debug!("reusing stored device id");
                return existing;
            }
            Ok(_) => {}
            Err(err) => {
                // Writing over an unreadable entry could clobber a valid id.
                warn!(error = %err, "device id storage unreadable; using an in-memory id");
                return self.ids.device_id();
            }
        }

        let created = self.ids.device_id();
        match self.store.save(&created) {
            Ok(()) => debug!("created and stored new device id"),
            Err(err) => {
                warn!(error = %err, "failed to persist device id; it will not survive a restart");
            }
        }
        created
    }
}

impl std::fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("resolved", &self.resolved.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tourbook_core::storage::DeviceIdStore;
    use tourbook_test_support::{FailingDeviceIdStore, InMemoryDeviceIdStore, SequenceIdGenerator};

    use super::DeviceIdentity;

    #[test]
    fn test_device_id_is_identical_across_requests() {
        // Arrange
        let store = Arc::new(InMemoryDeviceIdStore::new());
        let identity = DeviceIdentity::new(store, Arc::new(SequenceIdGenerator::new()));

        // Act
        let first = identity.device_id().to_owned();
        let second = identity.device_id().to_owned();

        // Assert
        assert_eq!(first, second);
    }

    #[test]
    fn test_device_id_is_created_and_persisted_when_store_is_empty() {
        let store = Arc::new(InMemoryDeviceIdStore::new());
        let identity = DeviceIdentity::new(store.clone(), Arc::new(SequenceIdGenerator::new()));

        assert_eq!(identity.device_id(), "device-1");
        assert_eq!(store.load().unwrap().as_deref(), Some("device-1"));
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_stored_device_id_is_reused_not_regenerated() {
        // Arrange
        let store = Arc::new(InMemoryDeviceIdStore::with_value("persisted-device"));
        let ids = Arc::new(SequenceIdGenerator::new());

        // Act
        let identity = DeviceIdentity::new(store.clone(), ids.clone());

        // Assert
        assert_eq!(identity.device_id(), "persisted-device");
        assert_eq!(store.save_count(), 0);
        assert_eq!(ids.device_ids_issued(), 0);
    }

    #[test]
    fn test_new_identity_over_same_store_sees_same_id() {
        let store = Arc::new(InMemoryDeviceIdStore::new());
        let ids = Arc::new(SequenceIdGenerator::new());

        let first = DeviceIdentity::new(store.clone(), ids.clone());
        let first_id = first.device_id().to_owned();
        let second = DeviceIdentity::new(store, ids);

        assert_eq!(second.device_id(), first_id);
    }

    #[test]
    fn test_blank_stored_value_is_replaced() {
        let store = Arc::new(InMemoryDeviceIdStore::with_value("  "));
        let identity = DeviceIdentity::new(store.clone(), Arc::new(SequenceIdGenerator::new()));

        assert_eq!(identity.device_id(), "device-1");
        assert_eq!(store.load().unwrap().as_deref(), Some("device-1"));
    }

    #[test]
    fn test_failing_store_falls_back_to_stable_in_memory_id() {
        let identity = DeviceIdentity::new(
            Arc::new(FailingDeviceIdStore),
            Arc::new(SequenceIdGenerator::new()),
        );

        assert_eq!(identity.device_id(), "device-1");
        assert_eq!(identity.device_id(), "device-1");
    }
}
