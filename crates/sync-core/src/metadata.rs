//! Sync metadata: the per-device watermark stored next to the data.
//!
//! One JSON file at the repository root records, per kind, the `updatedAt`
//! and content hash of every entity as of the last sync. The merge engine
//! compares both sides against it to tell "changed here" from "changed
//! there".
//!
//! Writes are optimistic: [`MetadataStore::save`] sends the revision token
//! from the preceding load or save, so two devices racing on the file get a
//! [`RemoteError::Conflict`] instead of silently losing an update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::entity::EntityKind;
use crate::remote::{RemoteError, RemoteRepository};
use crate::time;

/// Path of the metadata file in the remote repository.
pub const METADATA_PATH: &str = ".jarvis-sync.json";

const COMMIT_MESSAGE: &str = "Update sync metadata";

/// What this device last agreed with the remote for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedEntry {
    #[serde(with = "time::iso8601")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub sha: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    #[serde(default, with = "time::iso8601::option")]
    pub last_sync_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: BTreeMap<String, SyncedEntry>,
    #[serde(default)]
    pub tasks: BTreeMap<String, SyncedEntry>,
}

impl SyncMetadata {
    pub fn entries(&self, kind: EntityKind) -> &BTreeMap<String, SyncedEntry> {
        match kind {
            EntityKind::Note => &self.notes,
            EntityKind::Task => &self.tasks,
        }
    }

    pub fn entries_mut(&mut self, kind: EntityKind) -> &mut BTreeMap<String, SyncedEntry> {
        match kind {
            EntityKind::Note => &mut self.notes,
            EntityKind::Task => &mut self.tasks,
        }
    }

    /// Record the synced state of one entity.
    pub fn record(&mut self, kind: EntityKind, id: &str, updated_at: DateTime<Utc>, sha: String) {
        self.entries_mut(kind)
            .insert(id.to_string(), SyncedEntry { updated_at, sha });
    }
}

/// Loads and saves [`SyncMetadata`] through a remote repository.
pub struct MetadataStore<'a, R: ?Sized> {
    remote: &'a R,
    path: String,
    revision: Option<String>,
}

impl<'a, R: RemoteRepository + ?Sized> MetadataStore<'a, R> {
    pub fn new(remote: &'a R) -> Self {
        Self::with_path(remote, METADATA_PATH)
    }

    pub fn with_path(remote: &'a R, path: impl Into<String>) -> Self {
        Self {
            remote,
            path: path.into(),
            revision: None,
        }
    }

    /// Revision token the next save will be checked against.
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Read the record. A missing file is a fresh empty record.
    ///
    /// An unreadable record is also treated as empty (and logged), but its
    /// revision token is kept so the next save replaces it.
    pub async fn load(&mut self) -> Result<SyncMetadata, RemoteError> {
        let Some(file) = self.remote.read_file(&self.path).await? else {
            debug!("No sync metadata at {}, starting fresh", self.path);
            self.revision = None;
            return Ok(SyncMetadata::default());
        };

        self.revision = Some(file.sha);
        match serde_json::from_str(&file.content) {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!("Ignoring unreadable sync metadata at {}: {}", self.path, e);
                Ok(SyncMetadata::default())
            }
        }
    }

    /// Write the record, guarded by the last known revision token.
    pub async fn save(&mut self, record: &SyncMetadata) -> Result<(), RemoteError> {
        let content = serde_json::to_string_pretty(record).map_err(|e| RemoteError::Protocol {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let outcome = self
            .remote
            .write_file(&self.path, &content, COMMIT_MESSAGE, self.revision.as_deref())
            .await?;
        debug!("Saved sync metadata at {} ({})", self.path, outcome.sha);
        self.revision = Some(outcome.sha);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryRepository;

    fn at(value: &str) -> DateTime<Utc> {
        time::parse(value).unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let repo = InMemoryRepository::new();
        let mut store = MetadataStore::new(&repo);
        let record = store.load().await.unwrap();
        assert_eq!(record, SyncMetadata::default());
        assert!(store.revision().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let repo = InMemoryRepository::new();
        let mut record = SyncMetadata::default();
        record.last_sync_at = Some(at("2024-02-10T08:00:00.000Z"));
        record.record(EntityKind::Note, "n1", at("2024-02-01T09:00:00.000Z"), "abc".into());

        let mut store = MetadataStore::new(&repo);
        store.load().await.unwrap();
        store.save(&record).await.unwrap();
        // A second save reuses the token from the first
        store.save(&record).await.unwrap();

        let text = repo.content(METADATA_PATH).unwrap();
        assert!(text.contains("\"lastSyncAt\": \"2024-02-10T08:00:00.000Z\""));
        assert!(text.contains("\"updatedAt\": \"2024-02-01T09:00:00.000Z\""));

        let mut other = MetadataStore::new(&repo);
        assert_eq!(other.load().await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_stale_revision_conflicts() {
        let repo = InMemoryRepository::new();
        let mut store = MetadataStore::new(&repo);
        store.load().await.unwrap();
        store.save(&SyncMetadata::default()).await.unwrap();

        // Another device writes in between
        repo.insert(METADATA_PATH, "{\"lastSyncAt\":\"\",\"notes\":{},\"tasks\":{}}");

        let err = store.save(&SyncMetadata::default()).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_legacy_empty_last_sync_at() {
        let repo = InMemoryRepository::new();
        repo.insert(
            METADATA_PATH,
            r#"{"lastSyncAt":"","notes":{"n1":{"updatedAt":"2024-02-01T09:00:00.000Z","sha":""}}}"#,
        );
        let record = MetadataStore::new(&repo).load().await.unwrap();
        assert_eq!(record.last_sync_at, None);
        assert_eq!(record.notes["n1"].updated_at, at("2024-02-01T09:00:00.000Z"));
        assert!(record.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_replaced() {
        let repo = InMemoryRepository::new();
        repo.insert(METADATA_PATH, "not json");

        let mut store = MetadataStore::new(&repo);
        assert_eq!(store.load().await.unwrap(), SyncMetadata::default());
        store.save(&SyncMetadata::default()).await.unwrap();
        assert_ne!(repo.content(METADATA_PATH).as_deref(), Some("not json"));
    }
}
