//! Entity codec: remote text formats and remote paths.
//!
//! - Notes are markdown with a frontmatter block, a `# title` heading and
//!   the body. The heading is one line, so line breaks in a title are
//!   written as spaces.
//! - Tasks are pretty-printed JSON of the whole entity.
//!
//! Paths are `{kind}/{yyyy-MM}/{id}.{ext}`, using the UTC creation month.

use chrono::{DateTime, Datelike, Utc};
use serde_json::json;
use thiserror::Error;

use crate::entity::{Entity, EntityKind, Note, SyncEntity, Task};
use crate::{markdown, time};

const UNTITLED: &str = "Untitled";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("No entity id in {path}")]
    MissingId { path: String },

    #[error("Invalid {kind} file {path}: {message}")]
    Invalid {
        kind: EntityKind,
        path: String,
        message: String,
    },
}

/// Encode any entity to its remote text.
pub fn encode(entity: &Entity) -> String {
    match entity {
        Entity::Note(note) => note.encode(),
        Entity::Task(task) => task.encode(),
    }
}

/// Decode remote text found at `path` as an entity of `kind`.
pub fn decode(kind: EntityKind, path: &str, text: &str) -> Result<Entity, CodecError> {
    match kind {
        EntityKind::Note => Note::decode(path, text).map(Entity::Note),
        EntityKind::Task => Task::decode(path, text).map(Entity::Task),
    }
}

/// Remote path of any entity.
pub fn entity_path(entity: &Entity) -> String {
    remote_path(entity.kind(), entity.id(), entity.created_at())
}

/// `{kind}/{yyyy-MM}/{id}.{ext}`
pub fn remote_path(kind: EntityKind, id: &str, created_at: DateTime<Utc>) -> String {
    format!(
        "{}/{:04}-{:02}/{}.{}",
        kind.dir(),
        created_at.year(),
        created_at.month(),
        id,
        kind.extension()
    )
}

/// Recover an entity id from a remote path.
///
/// Understands both `notes/2024-02/<id>.md` and the older flat
/// `notes/2024-02-<id>.md` naming.
pub fn id_from_path(path: &str) -> Option<String> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => file_name,
    };
    let id = strip_month_prefix(stem).unwrap_or(stem);
    (!id.is_empty()).then(|| id.to_string())
}

/// Strip a leading `yyyy-MM-` from a flat-layout file stem.
fn strip_month_prefix(stem: &str) -> Option<&str> {
    let bytes = stem.as_bytes();
    if bytes.len() <= 8 {
        return None;
    }
    let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    if digits(0..4) && bytes[4] == b'-' && digits(5..7) && bytes[7] == b'-' {
        Some(&stem[8..])
    } else {
        None
    }
}

impl SyncEntity for Note {
    const KIND: EntityKind = EntityKind::Note;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn encode(&self) -> String {
        let fields = [
            ("id", json!(self.id)),
            ("tags", json!(self.tags)),
            ("createdAt", json!(time::format(&self.created_at))),
            ("updatedAt", json!(time::format(&self.updated_at))),
            ("isAiGenerated", json!(self.is_ai_generated)),
        ];
        let title = self.title.lines().collect::<Vec<_>>().join(" ");
        let body = format!("# {}\n\n{}\n", title, self.content);
        markdown::serialize(&fields, &body)
    }

    fn decode(path: &str, text: &str) -> Result<Self, CodecError> {
        let parsed = markdown::parse(text);

        let id = parsed
            .str_field("id")
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| id_from_path(path))
            .ok_or_else(|| CodecError::MissingId {
                path: path.to_string(),
            })?;

        let created_at = parsed.str_field("createdAt").and_then(time::parse);
        let updated_at = parsed.str_field("updatedAt").and_then(time::parse);
        let (created_at, updated_at) = match (created_at, updated_at) {
            (Some(created), Some(updated)) => (created, updated),
            (Some(created), None) => (created, created),
            (None, Some(updated)) => (updated, updated),
            (None, None) => {
                let now = time::now();
                (now, now)
            }
        };

        let (title, content) = markdown::split_title(&parsed.body);

        Ok(Note {
            id,
            title: title.unwrap_or_else(|| UNTITLED.to_string()),
            content,
            tags: parsed.list_field("tags").unwrap_or_default(),
            created_at,
            updated_at,
            is_ai_generated: parsed.bool_field("isAiGenerated").unwrap_or(false),
        })
    }
}

impl SyncEntity for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn encode(&self) -> String {
        serde_json::to_string_pretty(self).expect("task fields always serialize to JSON")
    }

    fn decode(path: &str, text: &str) -> Result<Self, CodecError> {
        let mut task: Task = serde_json::from_str(text).map_err(|e| CodecError::Invalid {
            kind: EntityKind::Task,
            path: path.to_string(),
            message: e.to_string(),
        })?;

        if task.id.is_empty() {
            task.id = id_from_path(path).ok_or_else(|| CodecError::MissingId {
                path: path.to_string(),
            })?;
        }

        Ok(task)
    }
}
