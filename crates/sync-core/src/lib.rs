//! sync-core: Last-write-wins sync of Jarvis notes and tasks against a
//! Git-hosted repository.
//!
//! This crate provides the core functionality for:
//! - Notes and tasks, and their on-remote text formats and paths
//! - Parsing/serializing markdown with frontmatter
//! - The sync metadata watermark and the merge engine
//! - The `SyncClient` orchestration entry point
//! - RemoteRepository, EntityStore and SettingsStore trait abstractions

pub mod client;
pub mod codec;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod hash;
pub mod markdown;
pub mod metadata;
pub mod remote;
pub mod settings;
pub mod store;
pub mod time;

pub use client::{SyncClient, SyncReport, SyncResult, SyncStatus};
pub use codec::CodecError;
pub use config::{ConfigError, RemoteTarget, SyncConfig};
pub use engine::{ConflictResolver, KeepLocal, KeepRemote, KindCounts, MergeEngine};
pub use entity::{Entity, EntityKind, Note, SyncEntity, Task, TaskPriority, TaskStatus};
pub use error::SyncError;
pub use metadata::{MetadataStore, SyncMetadata, METADATA_PATH};
pub use remote::{
    DeleteOutcome, FileChange, InMemoryRepository, RemoteEntry, RemoteError, RemoteFile,
    RemoteRepository, WriteOutcome,
};
pub use settings::{InMemorySettings, SettingsError, SettingsStore, SyncSettings};
pub use store::{EntityStore, InMemoryStore, StoreError, apply_downloads};
