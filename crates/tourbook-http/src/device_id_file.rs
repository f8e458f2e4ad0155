//! File-backed implementation of the `DeviceIdStore` trait.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use tourbook_core::error::AnalyticsError;
use tourbook_core::storage::DeviceIdStore;

#[derive(Debug, Serialize, Deserialize)]
struct StoredDeviceId {
    device_id: String,
}

/// Keeps the device identifier in a small JSON file.
///
/// A missing, empty or unparsable file reads as "nothing stored". Writes go
/// through a sibling temporary file and a rename so a crash never leaves a
/// half-written identifier behind.
#[derive(Debug, Clone)]
pub struct FileDeviceIdStore {
    path: PathBuf,
}

impl FileDeviceIdStore {
    /// Creates a store backed by `path`. Nothing is touched until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_error(&self, action: &str, err: &std::io::Error) -> AnalyticsError {
        AnalyticsError::Storage(format!("{action} {}: {err}", self.path.display()))
    }
}

impl DeviceIdStore for FileDeviceIdStore {
    fn load(&self) -> Result<Option<String>, AnalyticsError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.storage_error("failed to read", &err)),
        };

        if raw.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<StoredDeviceId>(&raw) {
            Ok(stored) if !stored.device_id.trim().is_empty() => Ok(Some(stored.device_id)),
            Ok(_) => Ok(None),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring unparsable device id file");
                Ok(None)
            }
        }
    }

    fn save(&self, device_id: &str) -> Result<(), AnalyticsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| self.storage_error("failed to create directory for", &e))?;
        }

        let contents = serde_json::to_vec(&StoredDeviceId {
            device_id: device_id.to_owned(),
        })?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents).map_err(|e| self.storage_error("failed to write", &e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.storage_error("failed to replace", &e))
    }
}
