//! Hand-off of verified licenses to the host application.
//!
//! The handshake only produces [`License`] values; where they live is the
//! host's business. Two small sinks are provided: a single JSON file and
//! an in-memory slot.

use crate::error::{LicenseError, LicenseResult};
use crate::license::License;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// File name used under the platform data directory.
pub const LICENSE_FILE_NAME: &str = "license.json";

/// Receives and returns the most recent verified license.
pub trait LicenseSink: Send + Sync {
    /// Stores `license`, replacing any previous one.
    fn save(&self, license: &License) -> LicenseResult<()>;

    /// Returns the stored license, if any.
    fn load(&self) -> LicenseResult<Option<License>>;

    /// Removes the stored license.
    fn clear(&self) -> LicenseResult<()>;

    /// Returns true if a stored license exists and has not expired.
    fn has_valid_license(&self) -> LicenseResult<bool> {
        Ok(self.load()?.is_some_and(|l| !l.is_expired()))
    }
}

/// Stores the license as one JSON document.
#[derive(Debug, Clone)]
pub struct FileLicenseStore {
    path: PathBuf,
}

impl FileLicenseStore {
    /// A store at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A store under the platform data directory (`<data>/<app>/license.json`).
    pub fn default_for(app_name: &str) -> LicenseResult<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| LicenseError::Storage("no platform data directory".to_string()))?;
        Ok(Self::new(base.join(app_name).join(LICENSE_FILE_NAME)))
    }

    /// The file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LicenseSink for FileLicenseStore {
    fn save(&self, license: &License) -> LicenseResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LicenseError::Storage(format!("cannot create {}: {e}", parent.display())))?;
        }
        let json = serde_json::to_string_pretty(license)
            .map_err(|e| LicenseError::Storage(format!("cannot encode license: {e}")))?;
        fs::write(&self.path, json)
            .map_err(|e| LicenseError::Storage(format!("cannot write {}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), "License saved");
        Ok(())
    }

    fn load(&self) -> LicenseResult<Option<License>> {
        match fs::read_to_string(&self.path) {
            Ok(json) => serde_json::from_str(&json).map(Some).map_err(|e| {
                LicenseError::Storage(format!("corrupt license file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LicenseError::Storage(format!(
                "cannot read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn clear(&self) -> LicenseResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LicenseError::Storage(format!(
                "cannot remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}

/// Keeps the license in memory only.
#[derive(Debug, Default)]
pub struct MemoryLicenseStore {
    slot: Mutex<Option<License>>,
}

impl MemoryLicenseStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<License>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LicenseSink for MemoryLicenseStore {
    fn save(&self, license: &License) -> LicenseResult<()> {
        *self.lock() = Some(license.clone());
        Ok(())
    }

    fn load(&self) -> LicenseResult<Option<License>> {
        Ok(self.lock().clone())
    }

    fn clear(&self) -> LicenseResult<()> {
        *self.lock() = None;
        Ok(())
    }
}
