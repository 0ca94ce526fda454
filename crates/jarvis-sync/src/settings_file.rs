//! Persistence for sync settings.
//!
//! Settings are stored in `.sync/settings.json` within the data directory,
//! next to (but separate from) the entity files.

use std::fs;
use std::path::{Path, PathBuf};
use sync_core::settings::{Result, SettingsStore, SyncSettings};

/// Storage for [`SyncSettings`] on disk.
pub struct SettingsFile {
    /// Path to the storage file.
    path: PathBuf,
}

impl SettingsFile {
    /// Create storage for the specified data directory.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(".sync").join("settings.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for SettingsFile {
    fn load(&self) -> Result<SyncSettings> {
        if !self.path.exists() {
            return Ok(SyncSettings::default());
        }

        let contents = fs::read_to_string(&self.path)?;
        let settings: SyncSettings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    fn save(&self, settings: &SyncSettings) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(settings)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
