//! Synced entities: notes and tasks.
//!
//! Both kinds share an identity (`id`, `createdAt`, `updatedAt`) exposed
//! through [`SyncEntity`], which is what the codec and the merge engine are
//! generic over. [`Entity`] is the tagged form for code that handles either
//! kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::CodecError;
use crate::time;

/// The kinds of entity that are synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Note,
    Task,
}

impl EntityKind {
    /// Top-level remote directory for this kind.
    pub fn dir(self) -> &'static str {
        match self {
            EntityKind::Note => "notes",
            EntityKind::Task => "tasks",
        }
    }

    /// File extension used on the remote.
    pub fn extension(self) -> &'static str {
        match self {
            EntityKind::Note => "md",
            EntityKind::Task => "json",
        }
    }

    /// Singular label used in commit messages and logs.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Note => "note",
            EntityKind::Task => "task",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir())
    }
}

/// Anything the merge engine can sync.
///
/// Implementations must keep `updated_at() >= created_at()` and must encode
/// and decode losslessly for every field carried by the textual format.
pub trait SyncEntity: Clone + std::fmt::Debug + PartialEq + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;

    /// Remote text representation.
    fn encode(&self) -> String;

    /// Inverse of [`SyncEntity::encode`]. `path` is where the text was found.
    fn decode(path: &str, text: &str) -> Result<Self, CodecError>;

    /// Canonical remote path, `{kind}/{yyyy-MM}/{id}.{ext}`.
    fn remote_path(&self) -> String {
        crate::codec::remote_path(Self::KIND, self.id(), self.created_at())
    }
}

/// A markdown note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(with = "time::iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "time::iso8601")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_ai_generated: bool,
}

impl Note {
    /// Create a note with a fresh ID, stamped now.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = time::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            is_ai_generated: false,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the note as locally modified.
    pub fn touch(&mut self) {
        self.updated_at = time::now().max(self.created_at);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::iso8601::option"
    )]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(with = "time::iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "time::iso8601")]
    pub updated_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::iso8601::option"
    )]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a task with a fresh ID, stamped now.
    pub fn new(title: impl Into<String>) -> Self {
        let now = time::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            category: None,
            due_date: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Mark the task as locally modified.
    pub fn touch(&mut self) {
        self.updated_at = time::now().max(self.created_at);
    }

    /// Move the task to `status`, stamping `completed_at` when it completes.
    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.touch();
        self.completed_at = match status {
            TaskStatus::Completed => Some(self.updated_at),
            _ => None,
        };
    }
}

/// Either kind of entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Note(Note),
    Task(Task),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Note(_) => EntityKind::Note,
            Entity::Task(_) => EntityKind::Task,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Note(note) => note.id(),
            Entity::Task(task) => task.id(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Entity::Note(note) => note.created_at,
            Entity::Task(task) => task.created_at,
        }
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            Entity::Note(note) => note.updated_at,
            Entity::Task(task) => task.updated_at,
        }
    }
}

impl From<Note> for Entity {
    fn from(note: Note) -> Self {
        Entity::Note(note)
    }
}

impl From<Task> for Entity {
    fn from(task: Task) -> Self {
        Entity::Task(task)
    }
}
