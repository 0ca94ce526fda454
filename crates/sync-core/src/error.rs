use thiserror::Error;

use crate::remote::RemoteError;
use crate::settings::SettingsError;

/// Anything that can stop a sync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Sync is not configured")]
    NotConfigured,

    #[error("Sync already in progress")]
    InProgress,

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
