//! Client-side sync settings kept outside the entity store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;

use crate::time;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Persisted per-device sync settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    /// Sync after every local mutation.
    #[serde(default)]
    pub auto_sync: bool,
    /// When the last fully successful sync finished.
    #[serde(default, with = "time::iso8601::option")]
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Where [`SyncSettings`] live between runs.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<SyncSettings>;
    fn save(&self, settings: &SyncSettings) -> Result<()>;
}

/// In-memory settings for testing
#[derive(Debug, Default)]
pub struct InMemorySettings {
    settings: Mutex<SyncSettings>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: SyncSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }

    pub fn snapshot(&self) -> SyncSettings {
        self.settings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl SettingsStore for InMemorySettings {
    fn load(&self) -> Result<SyncSettings> {
        Ok(self.snapshot())
    }

    fn save(&self, settings: &SyncSettings) -> Result<()> {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner()) = settings.clone();
        Ok(())
    }
}

impl<T: SettingsStore + ?Sized> SettingsStore for std::sync::Arc<T> {
    fn load(&self) -> Result<SyncSettings> {
        (**self).load()
    }

    fn save(&self, settings: &SyncSettings) -> Result<()> {
        (**self).save(settings)
    }
}
