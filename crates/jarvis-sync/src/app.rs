//! The local data directory wired to a sync client.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use github_remote::GitHubClient;
use sync_core::store::{EntityStore, apply_downloads};
use sync_core::{
    Note, RemoteRepository, SyncClient, SyncConfig, SyncResult, SyncStatus, Task, TaskPriority,
};

use crate::json_store::JsonStore;
use crate::settings_file::SettingsFile;

/// Fields for a new task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub category: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

pub struct App<R> {
    data_dir: PathBuf,
    notes: JsonStore<Note>,
    tasks: JsonStore<Task>,
    client: SyncClient<R, SettingsFile>,
}

impl App<GitHubClient> {
    /// Open a data directory, syncing to GitHub when `config` enables it.
    pub fn open(data_dir: &Path, config: SyncConfig) -> Result<Self> {
        let remote = GitHubClient::from_config(&config).context("Failed to create GitHub client")?;
        Self::with_remote(data_dir, config, remote)
    }
}

impl<R: RemoteRepository> App<R> {
    pub fn with_remote(data_dir: &Path, config: SyncConfig, remote: Option<R>) -> Result<Self> {
        let client = SyncClient::new(config, remote, SettingsFile::new(data_dir))
            .with_context(|| format!("Failed to load sync settings in {}", data_dir.display()))?;
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            notes: JsonStore::new(data_dir),
            tasks: JsonStore::new(data_dir),
            client,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn client(&self) -> &SyncClient<R, SettingsFile> {
        &self.client
    }

    /// Sync everything and store what came back.
    pub async fn sync(&self) -> Result<SyncResult> {
        let notes = self.notes.list_all().await.context("Failed to read local notes")?;
        let tasks = self.tasks.list_all().await.context("Failed to read local tasks")?;
        debug!("Syncing {} note(s) and {} task(s)", notes.len(), tasks.len());

        let report = self.client.sync(&notes, &tasks).await;

        let applied_notes = apply_downloads(&self.notes, &report.notes_to_apply())
            .await
            .context("Failed to store downloaded notes")?;
        let applied_tasks = apply_downloads(&self.tasks, &report.tasks_to_apply())
            .await
            .context("Failed to store downloaded tasks")?;
        if applied_notes + applied_tasks > 0 {
            info!(
                "Stored {} note(s) and {} task(s) from the remote",
                applied_notes, applied_tasks
            );
        }

        Ok(report.result)
    }

    pub async fn add_note(&self, title: &str, content: &str, tags: &[String]) -> Result<Note> {
        let note = Note::new(title, content).with_tags(tags.iter().cloned());
        self.notes.put(&note).await.context("Failed to save note")?;
        Ok(note)
    }

    pub async fn add_task(&self, fields: NewTask) -> Result<Task> {
        let mut task = Task::new(fields.title);
        task.description = fields.description;
        task.priority = fields.priority;
        task.category = fields.category;
        task.due_date = fields.due_date;
        self.tasks.put(&task).await.context("Failed to save task")?;
        Ok(task)
    }

    /// Sync after a local change, if auto-sync is on.
    pub async fn after_mutation(&self) -> Result<Option<SyncResult>> {
        if !self.client.should_auto_sync() {
            return Ok(None);
        }
        self.sync().await.map(Some)
    }

    pub async fn notes(&self) -> Result<Vec<Note>> {
        self.notes.list_all().await.context("Failed to read local notes")
    }

    pub async fn tasks(&self) -> Result<Vec<Task>> {
        self.tasks.list_all().await.context("Failed to read local tasks")
    }

    pub fn status(&self) -> SyncStatus {
        self.client.status()
    }

    pub async fn validate(&self) -> bool {
        self.client.validate_access().await
    }

    pub fn set_auto_sync(&self, enabled: bool) -> Result<()> {
        self.client
            .set_auto_sync(enabled)
            .context("Failed to save sync settings")
    }
}
