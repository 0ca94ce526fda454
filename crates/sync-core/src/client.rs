//! SyncClient: the one entry point the application talks to.
//!
//! The client owns the configuration, the remote, and the small settings
//! record (auto-sync toggle, last successful sync). A sync loads the
//! metadata once, runs notes then tasks through the [`MergeEngine`], saves
//! the metadata after each kind, and folds every failure into a
//! [`SyncResult`] instead of returning an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::config::{RemoteTarget, SyncConfig};
use crate::engine::{ConflictResolver, KindCounts, KindOutcome, MergeEngine};
use crate::entity::{Note, SyncEntity, Task};
use crate::error::{Result, SyncError};
use crate::metadata::{MetadataStore, SyncMetadata};
use crate::remote::RemoteRepository;
use crate::settings::{SettingsError, SettingsStore, SyncSettings};
use crate::time;

/// Outcome of one sync, as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub notes: KindCounts,
    pub tasks: KindCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A [`SyncResult`] plus the entities the caller should store locally.
///
/// Downloads are reported even when a later kind failed: the metadata for
/// the kinds that finished already records them.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub result: SyncResult,
    pub downloaded_notes: Vec<Note>,
    pub downloaded_tasks: Vec<Task>,
    /// Conflict resolutions that were uploaded.
    pub resolved_notes: Vec<Note>,
    pub resolved_tasks: Vec<Task>,
}

impl SyncReport {
    /// Every note the local store should take.
    pub fn notes_to_apply(&self) -> Vec<Note> {
        self.downloaded_notes
            .iter()
            .chain(&self.resolved_notes)
            .cloned()
            .collect()
    }

    /// Every task the local store should take.
    pub fn tasks_to_apply(&self) -> Vec<Task> {
        self.downloaded_tasks
            .iter()
            .chain(&self.resolved_tasks)
            .cloned()
            .collect()
    }
}

/// Snapshot of the client state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub target: Option<RemoteTarget>,
    pub enabled: bool,
    pub auto_sync: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub syncing: bool,
    pub last_error: Option<String>,
    pub last_result: Option<SyncResult>,
}

#[derive(Default)]
struct ClientState {
    settings: SyncSettings,
    last_error: Option<String>,
    last_result: Option<SyncResult>,
}

/// Clears the in-flight flag when a sync ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncClient<R, S> {
    config: SyncConfig,
    remote: Option<R>,
    settings_store: S,
    state: Mutex<ClientState>,
    syncing: AtomicBool,
    note_resolver: Option<Arc<dyn ConflictResolver<Note>>>,
    task_resolver: Option<Arc<dyn ConflictResolver<Task>>>,
}

impl<R: RemoteRepository, S: SettingsStore> SyncClient<R, S> {
    /// Create a client. `remote` is `None` when sync is not configured.
    pub fn new(
        config: SyncConfig,
        remote: Option<R>,
        settings_store: S,
    ) -> std::result::Result<Self, SettingsError> {
        let settings = settings_store.load()?;
        Ok(Self {
            config,
            remote,
            settings_store,
            state: Mutex::new(ClientState {
                settings,
                ..ClientState::default()
            }),
            syncing: AtomicBool::new(false),
            note_resolver: None,
            task_resolver: None,
        })
    }

    pub fn with_note_resolver(mut self, resolver: impl ConflictResolver<Note> + 'static) -> Self {
        self.note_resolver = Some(Arc::new(resolver));
        self
    }

    pub fn with_task_resolver(mut self, resolver: impl ConflictResolver<Task> + 'static) -> Self {
        self.task_resolver = Some(Arc::new(resolver));
        self
    }

    /// Use one resolver for both kinds.
    pub fn with_resolver<C>(self, resolver: C) -> Self
    where
        C: ConflictResolver<Note> + ConflictResolver<Task> + Clone + 'static,
    {
        self.with_note_resolver(resolver.clone())
            .with_task_resolver(resolver)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.remote.is_some() && self.config.is_enabled()
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    pub fn status(&self) -> SyncStatus {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        SyncStatus {
            target: self.config.target(),
            enabled: self.is_enabled(),
            auto_sync: state.settings.auto_sync,
            last_sync_at: state.settings.last_sync_at,
            syncing: self.is_syncing(),
            last_error: state.last_error.clone(),
            last_result: state.last_result.clone(),
        }
    }

    pub fn set_auto_sync(&self, enabled: bool) -> std::result::Result<(), SettingsError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut settings = state.settings.clone();
        settings.auto_sync = enabled;
        self.settings_store.save(&settings)?;
        state.settings = settings;
        info!("Auto-sync {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Whether a local mutation should trigger a sync.
    pub fn should_auto_sync(&self) -> bool {
        self.is_enabled()
            && self
                .state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .settings
                .auto_sync
    }

    /// Check the remote is reachable with the configured credentials.
    pub async fn validate_access(&self) -> bool {
        match self.enabled_remote() {
            Ok(remote) => remote.validate_access().await,
            Err(_) => false,
        }
    }

    /// Sync notes and tasks.
    pub async fn sync(&self, notes: &[Note], tasks: &[Task]) -> SyncReport {
        self.run(Some(notes), Some(tasks)).await
    }

    pub async fn sync_notes(&self, notes: &[Note]) -> SyncReport {
        self.run(Some(notes), None).await
    }

    pub async fn sync_tasks(&self, tasks: &[Task]) -> SyncReport {
        self.run(None, Some(tasks)).await
    }

    async fn run(&self, notes: Option<&[Note]>, tasks: Option<&[Task]>) -> SyncReport {
        let mut report = SyncReport::default();

        let Some(_guard) = InFlight::acquire(&self.syncing) else {
            warn!("Sync requested while another sync is running");
            report.result.error = Some(SyncError::InProgress.to_string());
            return report;
        };

        match self.sync_all(notes, tasks, &mut report).await {
            Ok(()) => {
                report.result.success = true;
                info!(
                    "Sync complete: notes {:?}, tasks {:?}",
                    report.result.notes, report.result.tasks
                );
            }
            Err(e) => {
                error!("Sync failed: {}", e);
                report.result.success = false;
                report.result.error = Some(e.to_string());
            }
        }

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.last_error = report.result.error.clone();
        state.last_result = Some(report.result.clone());
        report
    }

    async fn sync_all(
        &self,
        notes: Option<&[Note]>,
        tasks: Option<&[Task]>,
        report: &mut SyncReport,
    ) -> Result<()> {
        let remote = self.enabled_remote()?;
        let mut store = MetadataStore::with_path(remote, self.config.metadata_path.clone());
        let mut metadata = store.load().await?;
        let engine = MergeEngine::new(remote);

        if let Some(notes) = notes {
            let outcome = self
                .sync_kind(&engine, &mut store, &mut metadata, notes, self.note_resolver.as_deref())
                .await?;
            report.result.notes = outcome.counts;
            report.downloaded_notes = outcome.downloaded;
            report.resolved_notes = outcome.resolved;
        }

        if let Some(tasks) = tasks {
            let outcome = self
                .sync_kind(&engine, &mut store, &mut metadata, tasks, self.task_resolver.as_deref())
                .await?;
            report.result.tasks = outcome.counts;
            report.downloaded_tasks = outcome.downloaded;
            report.resolved_tasks = outcome.resolved;
        }

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut settings = state.settings.clone();
        settings.last_sync_at = metadata.last_sync_at;
        self.settings_store.save(&settings)?;
        state.settings = settings;
        Ok(())
    }

    async fn sync_kind<T: SyncEntity>(
        &self,
        engine: &MergeEngine<'_, R>,
        store: &mut MetadataStore<'_, R>,
        metadata: &mut SyncMetadata,
        local: &[T],
        resolver: Option<&dyn ConflictResolver<T>>,
    ) -> Result<KindOutcome<T>> {
        let outcome = engine.sync_kind(local, metadata, resolver).await?;
        metadata.last_sync_at = Some(time::now());
        store.save(metadata).await?;
        Ok(outcome)
    }

    fn enabled_remote(&self) -> Result<&R> {
        match &self.remote {
            Some(remote) if self.config.is_enabled() => Ok(remote),
            _ => Err(SyncError::NotConfigured),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{KeepLocal, KeepRemote};
    use crate::metadata::METADATA_PATH;
    use crate::remote::{
        DeleteOutcome, FileChange, InMemoryRepository, RemoteEntry, RemoteFile, WriteOutcome,
    };
    use crate::settings::InMemorySettings;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn at(value: &str) -> DateTime<Utc> {
        time::parse(value).unwrap()
    }

    fn enabled_config() -> SyncConfig {
        SyncConfig {
            token: Some("token".into()),
            owner: Some("me".into()),
            repo: Some("jarvis-data".into()),
            ..SyncConfig::default()
        }
    }

    fn client(
        repo: &Arc<InMemoryRepository>,
    ) -> SyncClient<Arc<InMemoryRepository>, InMemorySettings> {
        SyncClient::new(enabled_config(), Some(repo.clone()), InMemorySettings::new()).unwrap()
    }

    fn n1() -> Note {
        Note {
            id: "n1".into(),
            title: "Groceries".into(),
            content: "milk".into(),
            tags: vec!["home".into()],
            created_at: at("2024-02-10T08:00:00.000Z"),
            updated_at: at("2024-02-10T08:00:00.000Z"),
            is_ai_generated: false,
        }
    }

    fn batch_commits(repo: &InMemoryRepository) -> Vec<String> {
        repo.commits()
            .into_iter()
            .map(|c| c.message)
            .filter(|m| m.starts_with("Sync "))
            .collect()
    }

    #[tokio::test]
    async fn test_new_local_note_is_uploaded_to_month_path() {
        let repo = Arc::new(InMemoryRepository::new());
        let client = client(&repo);

        let report = client.sync(&[n1()], &[]).await;
        assert!(report.result.success, "{:?}", report.result.error);
        assert_eq!(report.result.notes.uploaded, 1);
        assert_eq!(report.result.tasks, KindCounts::default());

        let note_files: Vec<_> = repo
            .paths()
            .into_iter()
            .filter(|p| p.starts_with("notes/"))
            .collect();
        assert_eq!(note_files, vec!["notes/2024-02/n1.md".to_string()]);
        let text = repo.content("notes/2024-02/n1.md").unwrap();
        assert!(text.starts_with("---\nid: \"n1\""));
        assert_eq!(batch_commits(&repo), vec!["Sync 1 note(s)".to_string()]);

        // Metadata and lastSyncAt are recorded
        let meta = MetadataStore::new(&*repo).load().await.unwrap();
        assert_eq!(meta.notes["n1"].updated_at, n1().updated_at);
        assert!(meta.last_sync_at.is_some());
        assert!(client.status().last_sync_at.is_some());
    }

    #[tokio::test]
    async fn test_new_remote_entities_are_downloaded() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut task = Task::new("Renew passport");
        task.created_at = at("2024-01-05T10:00:00.000Z");
        task.updated_at = task.created_at;
        repo.insert(&task.remote_path(), &task.encode());

        let client = client(&repo);
        let report = client.sync(&[], &[]).await;
        assert!(report.result.success);
        assert_eq!(report.result.tasks.downloaded, 1);
        assert_eq!(report.downloaded_tasks, vec![task.clone()]);
        assert_eq!(report.tasks_to_apply(), vec![task]);
        assert!(batch_commits(&repo).is_empty());
    }

    #[tokio::test]
    async fn test_second_sync_is_a_no_op() {
        let repo = Arc::new(InMemoryRepository::new());
        let remote_note = Note {
            id: "r1".into(),
            ..n1()
        };
        repo.insert(&remote_note.remote_path(), &remote_note.encode());
        let client = client(&repo);

        let first = client.sync(&[n1()], &[]).await;
        assert!(first.result.success);
        assert_eq!(first.result.notes.downloaded, 1);

        // The caller applied the download
        let local = vec![n1(), remote_note];
        let second = client.sync(&local, &[]).await;
        assert!(second.result.success);
        assert_eq!(second.result.notes, KindCounts::default());
        assert_eq!(second.result.tasks, KindCounts::default());
        assert_eq!(batch_commits(&repo).len(), 1);
    }

    async fn edited_on_both_sides(
        repo: &Arc<InMemoryRepository>,
        client: &SyncClient<Arc<InMemoryRepository>, InMemorySettings>,
    ) -> Note {
        assert!(client.sync(&[n1()], &[]).await.result.success);

        let mut remote = n1();
        remote.title = "Edited elsewhere".into();
        remote.updated_at = at("2024-02-12T08:00:00.000Z");
        repo.insert(&remote.remote_path(), &remote.encode());

        let mut local = n1();
        local.title = "Edited here".into();
        local.updated_at = at("2024-02-11T08:00:00.000Z");
        local
    }

    #[tokio::test]
    async fn test_unresolved_conflict_is_counted_and_downloaded() {
        let repo = Arc::new(InMemoryRepository::new());
        let client = client(&repo);
        let local = edited_on_both_sides(&repo, &client).await;

        let report = client.sync(&[local], &[]).await;
        assert!(report.result.success);
        assert_eq!(report.result.notes.conflicts, 1);
        assert_eq!(report.result.notes.uploaded, 0);
        assert_eq!(report.result.notes.downloaded, 1);
        assert_eq!(report.downloaded_notes[0].title, "Edited elsewhere");
        let text = repo.content("notes/2024-02/n1.md").unwrap();
        assert!(text.contains("# Edited elsewhere"));

        // Applying the download brings both sides together
        let report = client.sync(&report.notes_to_apply(), &[]).await;
        assert_eq!(report.result.notes, KindCounts::default());
    }

    #[tokio::test]
    async fn test_remote_edit_is_offered_until_applied() {
        let repo = Arc::new(InMemoryRepository::new());
        let client = client(&repo);
        assert!(client.sync(&[n1()], &[]).await.result.success);

        let mut remote = n1();
        remote.content = "milk, eggs".into();
        remote.updated_at = at("2024-02-12T08:00:00.000Z");
        repo.insert(&remote.remote_path(), &remote.encode());

        let first = client.sync(&[n1()], &[]).await;
        assert_eq!(first.result.notes.downloaded, 1);

        // The caller did not store the download
        let second = client.sync(&[n1()], &[]).await;
        assert!(second.result.success);
        assert_eq!(second.result.notes.downloaded, 1);
        assert_eq!(second.downloaded_notes, vec![remote.clone()]);

        let third = client.sync(&[remote], &[]).await;
        assert_eq!(third.result.notes, KindCounts::default());
        let meta = MetadataStore::new(&*repo).load().await.unwrap();
        assert_eq!(meta.notes["n1"].updated_at, at("2024-02-12T08:00:00.000Z"));
    }

    #[tokio::test]
    async fn test_conflict_resolution_is_uploaded() {
        let repo = Arc::new(InMemoryRepository::new());
        let client = client(&repo).with_resolver(KeepLocal);
        let local = edited_on_both_sides(&repo, &client).await;

        let report = client.sync(&[local.clone()], &[]).await;
        assert!(report.result.success);
        assert_eq!(report.result.notes.conflicts, 1);
        assert_eq!(report.result.notes.uploaded, 1);
        assert_eq!(report.resolved_notes, vec![local]);
        let text = repo.content("notes/2024-02/n1.md").unwrap();
        assert!(text.contains("# Edited here"));
    }

    #[tokio::test]
    async fn test_keep_remote_resolution_is_returned_for_local_apply() {
        let repo = Arc::new(InMemoryRepository::new());
        let client = client(&repo).with_note_resolver(KeepRemote);
        let local = edited_on_both_sides(&repo, &client).await;

        let report = client.sync(&[local], &[]).await;
        assert_eq!(report.result.notes.uploaded, 1);
        assert_eq!(report.notes_to_apply()[0].title, "Edited elsewhere");
    }

    #[tokio::test]
    async fn test_equal_timestamps_never_conflict() {
        let repo = Arc::new(InMemoryRepository::new());
        let client = client(&repo);
        assert!(client.sync(&[n1()], &[]).await.result.success);

        let edited_at = at("2024-02-11T08:00:00.000Z");
        let mut remote = n1();
        remote.content = "remote body".into();
        remote.updated_at = edited_at;
        repo.insert(&remote.remote_path(), &remote.encode());
        let mut local = n1();
        local.content = "local body".into();
        local.updated_at = edited_at;

        let report = client.sync(&[local], &[]).await;
        assert!(report.result.success);
        assert_eq!(report.result.notes, KindCounts::default());
    }

    #[tokio::test]
    async fn test_failed_batch_reports_error_and_keeps_watermark() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.set_fail_batches(true);
        let client = client(&repo);

        let report = client.sync(&[n1()], &[]).await;
        assert!(!report.result.success);
        assert!(report.result.error.is_some());
        assert!(repo.paths().is_empty());
        assert!(client.status().last_sync_at.is_none());
        assert_eq!(client.status().last_error, report.result.error);
    }

    #[tokio::test]
    async fn test_failed_metadata_write_after_commit_recovers() {
        let repo = Arc::new(InMemoryRepository::new());
        repo.set_fail_writes(true);
        let client = client(&repo);

        let report = client.sync(&[n1()], &[]).await;
        assert!(!report.result.success);
        assert!(report.result.error.is_some());
        // The batch landed, the watermark did not
        assert!(repo.content("notes/2024-02/n1.md").is_some());
        assert!(repo.content(METADATA_PATH).is_none());
        assert!(client.status().last_sync_at.is_none());

        repo.set_fail_writes(false);
        let retry = client.sync(&[n1()], &[]).await;
        assert!(retry.result.success, "{:?}", retry.result.error);
        assert_eq!(retry.result.notes, KindCounts::default());
        assert_eq!(batch_commits(&repo), vec!["Sync 1 note(s)".to_string()]);

        let meta = MetadataStore::new(&*repo).load().await.unwrap();
        assert_eq!(meta.notes["n1"].updated_at, n1().updated_at);
        assert!(client.status().last_sync_at.is_some());
    }

    #[tokio::test]
    async fn test_task_failure_keeps_note_results() {
        let repo = Arc::new(InMemoryRepository::new());
        let remote_note = n1();
        repo.insert(&remote_note.remote_path(), &remote_note.encode());
        repo.set_fail_batches(true);
        let client = client(&repo);

        let report = client.sync(&[], &[Task::new("Pay rent")]).await;
        assert!(!report.result.success);
        assert_eq!(report.result.notes.downloaded, 1);
        assert_eq!(report.downloaded_notes, vec![remote_note]);

        // Notes metadata was saved before tasks ran
        let meta = MetadataStore::new(&*repo).load().await.unwrap();
        assert!(meta.notes.contains_key("n1"));
        assert!(meta.tasks.is_empty());
        assert!(client.status().last_sync_at.is_none());
    }

    #[tokio::test]
    async fn test_single_kind_sync() {
        let repo = Arc::new(InMemoryRepository::new());
        let client = client(&repo);
        let report = client.sync_tasks(&[Task::new("Call the bank")]).await;
        assert!(report.result.success);
        assert_eq!(report.result.tasks.uploaded, 1);
        assert_eq!(batch_commits(&repo), vec!["Sync 1 task(s)".to_string()]);

        let report = client.sync_notes(&[n1()]).await;
        assert_eq!(report.result.notes.uploaded, 1);
        assert_eq!(report.result.tasks, KindCounts::default());
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_softly() {
        let client: SyncClient<InMemoryRepository, _> =
            SyncClient::new(SyncConfig::default(), None, InMemorySettings::new()).unwrap();
        let report = client.sync(&[n1()], &[]).await;
        assert!(!report.result.success);
        assert_eq!(report.result.error.as_deref(), Some("Sync is not configured"));
        assert!(!client.validate_access().await);
        assert!(!client.status().enabled);
    }

    #[tokio::test]
    async fn test_auto_sync_is_persisted() {
        let repo = Arc::new(InMemoryRepository::new());
        let settings = Arc::new(InMemorySettings::new());
        let client =
            SyncClient::new(enabled_config(), Some(repo.clone()), settings.clone()).unwrap();
        assert!(!client.should_auto_sync());

        client.set_auto_sync(true).unwrap();
        assert!(client.should_auto_sync());
        assert!(settings.snapshot().auto_sync);

        let reloaded = SyncClient::new(enabled_config(), Some(repo), settings).unwrap();
        assert!(reloaded.status().auto_sync);
        assert!(reloaded.validate_access().await);
    }

    #[tokio::test]
    async fn test_status_reflects_stored_settings() {
        let synced_at = at("2024-03-01T12:00:00.000Z");
        let settings = InMemorySettings::with_settings(SyncSettings {
            auto_sync: true,
            last_sync_at: Some(synced_at),
        });
        let repo = Arc::new(InMemoryRepository::new());
        let client = SyncClient::new(enabled_config(), Some(repo.clone()), settings).unwrap();

        let status = client.status();
        assert!(status.enabled);
        assert!(status.auto_sync);
        assert_eq!(status.last_sync_at, Some(synced_at));
        assert_eq!(status.target.map(|t| t.to_string()).as_deref(), Some("me/jarvis-data@main"));

        repo.set_reachable(false);
        assert!(!client.validate_access().await);
    }

    /// Holds the first metadata read until released.
    struct GatedRepository {
        inner: InMemoryRepository,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl RemoteRepository for GatedRepository {
        async fn read_file(&self, path: &str) -> crate::remote::Result<Option<RemoteFile>> {
            if path == METADATA_PATH {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.read_file(path).await
        }

        async fn list_directory(&self, path: &str) -> crate::remote::Result<Vec<RemoteEntry>> {
            self.inner.list_directory(path).await
        }

        async fn write_file(
            &self,
            path: &str,
            content: &str,
            message: &str,
            expected_sha: Option<&str>,
        ) -> crate::remote::Result<WriteOutcome> {
            self.inner.write_file(path, content, message, expected_sha).await
        }

        async fn delete_file(
            &self,
            path: &str,
            sha: &str,
            message: &str,
        ) -> crate::remote::Result<DeleteOutcome> {
            self.inner.delete_file(path, sha, message).await
        }

        async fn write_files_batch(
            &self,
            files: &[FileChange],
            message: &str,
        ) -> crate::remote::Result<String> {
            self.inner.write_files_batch(files, message).await
        }

        async fn validate_access(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_concurrent_sync_is_rejected() {
        let repo = Arc::new(GatedRepository {
            inner: InMemoryRepository::new(),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let client = Arc::new(
            SyncClient::new(enabled_config(), Some(repo.clone()), InMemorySettings::new())
                .unwrap(),
        );

        let first = {
            let client = client.clone();
            tokio::spawn(async move { client.sync(&[n1()], &[]).await })
        };
        repo.entered.notified().await;
        assert!(client.is_syncing());

        let second = client.sync(&[n1()], &[]).await;
        assert!(!second.result.success);
        assert_eq!(second.result.error.as_deref(), Some("Sync already in progress"));

        repo.release.notify_one();
        let first = first.await.unwrap();
        assert!(first.result.success);
        assert!(!client.is_syncing());
    }
}
