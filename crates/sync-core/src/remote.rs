//! RemoteRepository trait abstraction for the Git-hosted sync store.
//!
//! Implementations:
//! - `InMemoryRepository` - For testing
//! - `GitHubClient` (in github-remote) - GitHub REST API over HTTPS
//!
//! The remote knows nothing about entities: it reads, writes, lists and
//! deletes files on one branch, and can write many files as one commit.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::RwLock;
use thiserror::Error;

use crate::hash::ContentHash;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// The revision token no longer matches the remote (or the branch moved).
    #[error("Revision conflict on {path}")]
    Conflict { path: String },

    #[error("Remote returned {status} for {path}: {message}")]
    Status {
        status: u16,
        path: String,
        message: String,
    },

    #[error("Request for {path} timed out")]
    Timeout { path: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected response for {path}: {message}")]
    Protocol { path: String, message: String },

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),
}

impl RemoteError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, RemoteError>;

/// A file read from the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub content: String,
    /// Revision token required to safely overwrite or delete this file.
    pub sha: String,
}

/// Directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// File or directory name (not full path)
    pub name: String,
    /// Whether this is a directory
    pub is_dir: bool,
}

/// One file in a batch commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub content: String,
}

/// Result of a single-file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// New revision token of the file.
    pub sha: String,
    pub commit_sha: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    Conflict,
}

/// Platform-independent access to the remote repository branch.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait RemoteRepository: Send + Sync {
    /// Read a file. `Ok(None)` when the path does not exist.
    async fn read_file(&self, path: &str) -> Result<Option<RemoteFile>>;

    /// List a directory (non-recursive). Missing directories are empty.
    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Create or overwrite a file.
    ///
    /// With `expected_sha`, fails with [`RemoteError::Conflict`] if the file
    /// has moved on. Without it, fails the same way if the file exists.
    async fn write_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        expected_sha: Option<&str>,
    ) -> Result<WriteOutcome>;

    /// Delete a file at a known revision.
    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> Result<DeleteOutcome>;

    /// Write all files in one commit. Returns the commit id.
    ///
    /// Either every file lands or the branch is left untouched.
    async fn write_files_batch(&self, files: &[FileChange], message: &str) -> Result<String>;

    /// Cheap check that the repository is reachable with our credentials.
    async fn validate_access(&self) -> bool;
}

/// A commit made against an [`InMemoryRepository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: String,
    pub message: String,
    pub paths: Vec<String>,
}

#[derive(Default)]
struct RepoState {
    files: BTreeMap<String, String>,
    commits: Vec<CommitRecord>,
    failing_reads: HashSet<String>,
    fail_batches: bool,
    fail_writes: bool,
    reachable: bool,
}

/// In-memory repository for testing
pub struct InMemoryRepository {
    state: RwLock<RepoState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RepoState {
                reachable: true,
                ..RepoState::default()
            }),
        }
    }

    /// Put a file directly, as another device or a human editing the repo would.
    pub fn insert(&self, path: &str, content: &str) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.files.insert(Self::normalize_path(path), content.to_string());
    }

    pub fn content(&self, path: &str) -> Option<String> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.files.get(&Self::normalize_path(path)).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.files.keys().cloned().collect()
    }

    pub fn commits(&self) -> Vec<CommitRecord> {
        self.state.read().unwrap_or_else(|e| e.into_inner()).commits.clone()
    }

    /// Make reads of `path` fail with a transport error.
    pub fn fail_reads_of(&self, path: &str) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.failing_reads.insert(Self::normalize_path(path));
    }

    /// Make every batch commit fail before the branch moves.
    pub fn set_fail_batches(&self, fail: bool) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).fail_batches = fail;
    }

    /// Make every single-file write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).fail_writes = fail;
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).reachable = reachable;
    }

    fn normalize_path(path: &str) -> String {
        path.trim_matches('/').to_string()
    }

    fn sha_of(content: &str) -> String {
        ContentHash::from_content(content).into_string()
    }

    fn record_commit(state: &mut RepoState, message: &str, paths: Vec<String>) -> String {
        let id = format!("commit-{}", state.commits.len() + 1);
        state.commits.push(CommitRecord {
            id: id.clone(),
            message: message.to_string(),
            paths,
        });
        id
    }

    fn injected(path: &str) -> RemoteError {
        RemoteError::Status {
            status: 500,
            path: path.to_string(),
            message: "injected failure".to_string(),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RemoteRepository for InMemoryRepository {
    async fn read_file(&self, path: &str) -> Result<Option<RemoteFile>> {
        let path = Self::normalize_path(path);
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        if state.failing_reads.contains(&path) {
            return Err(RemoteError::Request(format!("connection reset reading {path}")));
        }
        Ok(state.files.get(&path).map(|content| RemoteFile {
            path: path.clone(),
            content: content.clone(),
            sha: Self::sha_of(content),
        }))
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let path = Self::normalize_path(path);
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path)
        };

        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let mut files = BTreeSet::new();
        let mut dirs = BTreeSet::new();
        for file_path in state.files.keys() {
            if let Some(rest) = file_path.strip_prefix(&prefix) {
                match rest.split_once('/') {
                    Some((dir, _)) => {
                        dirs.insert(dir.to_string());
                    }
                    None => {
                        files.insert(rest.to_string());
                    }
                }
            }
        }

        let entries = dirs
            .into_iter()
            .map(|name| RemoteEntry { name, is_dir: true })
            .chain(files.into_iter().map(|name| RemoteEntry { name, is_dir: false }))
            .collect();
        Ok(entries)
    }

    async fn write_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        expected_sha: Option<&str>,
    ) -> Result<WriteOutcome> {
        let path = Self::normalize_path(path);
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.fail_writes {
            return Err(Self::injected(&path));
        }

        let current = state.files.get(&path).map(|c| Self::sha_of(c));
        let stale = match (expected_sha, current.as_deref()) {
            (Some(expected), Some(current)) => expected != current,
            (Some(_), None) => true,
            (None, Some(_)) => true,
            (None, None) => false,
        };
        if stale {
            return Err(RemoteError::Conflict { path });
        }

        state.files.insert(path.clone(), content.to_string());
        let commit_sha = Self::record_commit(&mut state, message, vec![path]);
        Ok(WriteOutcome {
            sha: Self::sha_of(content),
            commit_sha,
        })
    }

    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> Result<DeleteOutcome> {
        let path = Self::normalize_path(path);
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let Some(content) = state.files.get(&path) else {
            return Ok(DeleteOutcome::NotFound);
        };
        if Self::sha_of(content) != sha {
            return Ok(DeleteOutcome::Conflict);
        }
        state.files.remove(&path);
        Self::record_commit(&mut state, message, vec![path]);
        Ok(DeleteOutcome::Deleted)
    }

    async fn write_files_batch(&self, files: &[FileChange], message: &str) -> Result<String> {
        if files.is_empty() {
            return Err(RemoteError::InvalidBatch("no files to commit".to_string()));
        }
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.fail_batches {
            return Err(Self::injected("git/blobs"));
        }

        let mut paths = Vec::with_capacity(files.len());
        for file in files {
            let path = Self::normalize_path(&file.path);
            state.files.insert(path.clone(), file.content.clone());
            paths.push(path);
        }
        Ok(Self::record_commit(&mut state, message, paths))
    }

    async fn validate_access(&self) -> bool {
        self.state.read().unwrap_or_else(|e| e.into_inner()).reachable
    }
}

// Implement RemoteRepository for Arc<T> where T: RemoteRepository
// This allows sharing one repository between several clients in tests
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl<T: RemoteRepository + ?Sized> RemoteRepository for std::sync::Arc<T> {
    async fn read_file(&self, path: &str) -> Result<Option<RemoteFile>> {
        (**self).read_file(path).await
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        (**self).list_directory(path).await
    }

    async fn write_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        expected_sha: Option<&str>,
    ) -> Result<WriteOutcome> {
        (**self).write_file(path, content, message, expected_sha).await
    }

    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> Result<DeleteOutcome> {
        (**self).delete_file(path, sha, message).await
    }

    async fn write_files_batch(&self, files: &[FileChange], message: &str) -> Result<String> {
        (**self).write_files_batch(files, message).await
    }

    async fn validate_access(&self) -> bool {
        (**self).validate_access().await
    }
}
