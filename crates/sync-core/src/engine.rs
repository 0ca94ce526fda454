//! MergeEngine: last-write-wins reconciliation of one entity kind.
//!
//! A round for one kind works as follows:
//!
//! 1. Discover the remote copies: list `{kind}/`, descend into each month
//!    directory, fetch and decode every file. Per-file failures are logged
//!    and skipped.
//! 2. Classify every entity against the local copy, the remote copy and the
//!    last synced watermark (see [`plan`]). This is pure and deterministic,
//!    and happens before anything is written.
//! 3. Resolve conflicts through the caller's [`ConflictResolver`], if any.
//!    A resolved entity is uploaded instead of downloaded; an unresolved one
//!    is downloaded.
//! 4. Commit every upload in one batch.
//! 5. Update the in-memory metadata. Persisting it is the caller's job.
//!
//! Downloads are handed back to the caller; the engine never writes the
//! local store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::entity::SyncEntity;
use crate::hash::ContentHash;
use crate::metadata::{SyncMetadata, SyncedEntry};
use crate::remote::{FileChange, RemoteError, RemoteRepository};

/// A decoded remote file.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCopy<T> {
    pub entity: T,
    pub path: String,
    /// Content hash of the file text.
    pub hash: String,
}

/// Everything discovered on the remote for one kind.
#[derive(Debug, Clone)]
pub struct RemoteSnapshot<T> {
    /// Decoded entities by ID.
    pub entities: BTreeMap<String, RemoteCopy<T>>,
    /// Files, and directories (with a trailing `/`), that could not be read.
    pub unreadable: BTreeSet<String>,
}

impl<T> Default for RemoteSnapshot<T> {
    fn default() -> Self {
        Self {
            entities: BTreeMap::new(),
            unreadable: BTreeSet::new(),
        }
    }
}

impl<T: SyncEntity> RemoteSnapshot<T> {
    /// Add a copy. Of two copies with one ID, the newer wins.
    pub fn insert(&mut self, copy: RemoteCopy<T>) {
        let id = copy.entity.id().to_string();
        match self.entities.get(&id) {
            Some(existing) if existing.entity.updated_at() >= copy.entity.updated_at() => {
                debug!(
                    "Ignoring older duplicate of {} at {} (keeping {})",
                    id, copy.path, existing.path
                );
            }
            _ => {
                self.entities.insert(id, copy);
            }
        }
    }

    /// Whether `path` (or its directory) failed to read during discovery.
    pub fn is_unreadable(&self, path: &str) -> bool {
        self.unreadable
            .iter()
            .any(|p| p == path || (p.ends_with('/') && path.starts_with(p.as_str())))
    }
}

/// Both sides changed since the last sync and the remote is newer.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict<T> {
    pub local: T,
    pub remote: RemoteCopy<T>,
}

/// Per-entity decisions for one kind, each list ordered by ID.
#[derive(Debug, Clone)]
pub struct Plan<T> {
    pub uploads: Vec<T>,
    pub downloads: Vec<RemoteCopy<T>>,
    pub conflicts: Vec<Conflict<T>>,
    /// Identical timestamps on both sides. Recorded as the new baseline.
    pub in_sync: Vec<RemoteCopy<T>>,
    /// IDs left alone this round.
    pub skipped: Vec<String>,
}

impl<T> Default for Plan<T> {
    fn default() -> Self {
        Self {
            uploads: Vec::new(),
            downloads: Vec::new(),
            conflicts: Vec::new(),
            in_sync: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Classify every local and remote entity of one kind.
///
/// - Local only: upload (unless its remote path could not be read).
/// - Remote only: download.
/// - Both, changed locally since the last sync: upload when local is newer,
///   conflict when remote is newer, nothing when they are equal.
/// - Both, changed remotely since the last sync and newer than local:
///   download. A conflict where the remote is newer meets this too, so it
///   is both a conflict and a download.
///
/// Without a watermark for an entity present on both sides, nothing moves
/// unless the timestamps already agree.
pub fn plan<T: SyncEntity>(
    local: &[T],
    remote: &RemoteSnapshot<T>,
    synced: &BTreeMap<String, SyncedEntry>,
) -> Plan<T> {
    let mut locals: BTreeMap<&str, &T> = BTreeMap::new();
    for entity in local {
        match locals.get(entity.id()) {
            Some(existing) if existing.updated_at() >= entity.updated_at() => {}
            _ => {
                locals.insert(entity.id(), entity);
            }
        }
    }

    let mut plan = Plan::default();

    for (&id, &entity) in &locals {
        let Some(copy) = remote.entities.get(id) else {
            let path = entity.remote_path();
            if remote.is_unreadable(&path) {
                warn!("Skipping {} {}: remote copy at {} is unreadable", T::KIND.label(), id, path);
                plan.skipped.push(id.to_string());
            } else {
                plan.uploads.push(entity.clone());
            }
            continue;
        };

        let local_at = entity.updated_at();
        let remote_at = copy.entity.updated_at();
        if local_at == remote_at {
            plan.in_sync.push(copy.clone());
            continue;
        }

        let Some(baseline) = synced.get(id) else {
            debug!("No sync baseline for {} {}, leaving it alone", T::KIND.label(), id);
            plan.skipped.push(id.to_string());
            continue;
        };

        if local_at > baseline.updated_at {
            if local_at > remote_at {
                plan.uploads.push(entity.clone());
            } else {
                debug!("Conflict on {} {}: both sides changed", T::KIND.label(), id);
                plan.conflicts.push(Conflict {
                    local: entity.clone(),
                    remote: copy.clone(),
                });
            }
        }
    }

    for (id, copy) in &remote.entities {
        match locals.get(id.as_str()) {
            None => plan.downloads.push(copy.clone()),
            Some(entity) => {
                let remote_at = copy.entity.updated_at();
                let changed_remotely = synced
                    .get(id)
                    .is_some_and(|baseline| remote_at > baseline.updated_at);
                if changed_remotely && remote_at > entity.updated_at() {
                    plan.downloads.push(copy.clone());
                }
            }
        }
    }

    plan
}

/// Decides the fate of a conflicted entity.
///
/// Returning `None` leaves the entity alone for this round; it is still
/// counted as a conflict.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ConflictResolver<T: SyncEntity>: Send + Sync {
    async fn resolve(&self, local: &T, remote: &T) -> Option<T>;
}

/// Resolve every conflict in favour of this device.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepLocal;

/// Resolve every conflict in favour of the remote copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepRemote;

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl<T: SyncEntity> ConflictResolver<T> for KeepLocal {
    async fn resolve(&self, local: &T, _remote: &T) -> Option<T> {
        Some(local.clone())
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl<T: SyncEntity> ConflictResolver<T> for KeepRemote {
    async fn resolve(&self, _local: &T, remote: &T) -> Option<T> {
        Some(remote.clone())
    }
}

/// Per-kind counters reported to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub uploaded: usize,
    pub downloaded: usize,
    pub conflicts: usize,
}

/// What one kind's round did.
#[derive(Debug, Clone)]
pub struct KindOutcome<T> {
    pub counts: KindCounts,
    /// Remote entities the caller should store locally.
    pub downloaded: Vec<T>,
    /// Conflict resolutions that were uploaded.
    pub resolved: Vec<T>,
    /// The batch commit, when anything was uploaded.
    pub commit: Option<String>,
}

impl<T> Default for KindOutcome<T> {
    fn default() -> Self {
        Self {
            counts: KindCounts::default(),
            downloaded: Vec::new(),
            resolved: Vec::new(),
            commit: None,
        }
    }
}

/// Runs sync rounds against a remote repository.
pub struct MergeEngine<'a, R: ?Sized> {
    remote: &'a R,
}

impl<'a, R: RemoteRepository + ?Sized> MergeEngine<'a, R> {
    pub fn new(remote: &'a R) -> Self {
        Self { remote }
    }

    /// Fetch and decode every remote entity of kind `T`.
    ///
    /// Failing to list the kind's own directory aborts the round; anything
    /// below it is skipped and remembered as unreadable.
    pub async fn discover<T: SyncEntity>(&self) -> Result<RemoteSnapshot<T>, RemoteError> {
        let root = T::KIND.dir();
        let mut snapshot = RemoteSnapshot::default();

        for entry in self.remote.list_directory(root).await? {
            let path = format!("{}/{}", root, entry.name);
            if !entry.is_dir {
                self.fetch(&path, &mut snapshot).await;
                continue;
            }

            match self.remote.list_directory(&path).await {
                Ok(files) => {
                    for file in files.iter().filter(|f| !f.is_dir) {
                        self.fetch(&format!("{}/{}", path, file.name), &mut snapshot)
                            .await;
                    }
                }
                Err(e) => {
                    warn!("Failed to list {}: {}", path, e);
                    snapshot.unreadable.insert(format!("{}/", path));
                }
            }
        }

        debug!(
            "Discovered {} remote {}",
            snapshot.entities.len(),
            T::KIND
        );
        Ok(snapshot)
    }

    async fn fetch<T: SyncEntity>(&self, path: &str, snapshot: &mut RemoteSnapshot<T>) {
        let extension = format!(".{}", T::KIND.extension());
        if !path.ends_with(&extension) {
            return;
        }

        match self.remote.read_file(path).await {
            Ok(Some(file)) => match T::decode(path, &file.content) {
                Ok(entity) => snapshot.insert(RemoteCopy {
                    entity,
                    path: path.to_string(),
                    hash: ContentHash::from_content(&file.content).into_string(),
                }),
                Err(e) => warn!("Skipping {}: {}", path, e),
            },
            Ok(None) => debug!("{} vanished during discovery", path),
            Err(e) => {
                warn!("Failed to fetch {}: {}", path, e);
                snapshot.unreadable.insert(path.to_string());
            }
        }
    }

    /// Run one round for kind `T`.
    ///
    /// On success `metadata` holds the new watermark for every uploaded or
    /// already matching entity, and for downloads with no local copy.
    /// Downloads that replace a local copy keep the old watermark until the
    /// caller has stored them and a later round sees both sides match. On
    /// error `metadata` is untouched and nothing was committed.
    pub async fn sync_kind<T: SyncEntity>(
        &self,
        local: &[T],
        metadata: &mut SyncMetadata,
        resolver: Option<&dyn ConflictResolver<T>>,
    ) -> Result<KindOutcome<T>, RemoteError> {
        let snapshot = self.discover::<T>().await?;
        let plan = plan(local, &snapshot, metadata.entries(T::KIND));

        let mut outcome = KindOutcome {
            counts: KindCounts {
                conflicts: plan.conflicts.len(),
                ..KindCounts::default()
            },
            ..KindOutcome::default()
        };

        let mut uploads = plan.uploads;
        let mut downloads = plan.downloads;
        for conflict in &plan.conflicts {
            let Some(resolver) = resolver else {
                info!(
                    "Skipping conflicted {} {}",
                    T::KIND.label(),
                    conflict.local.id()
                );
                continue;
            };
            match resolver.resolve(&conflict.local, &conflict.remote.entity).await {
                Some(resolved) if resolved.id() == conflict.local.id() => {
                    downloads.retain(|copy| copy.entity.id() != resolved.id());
                    uploads.push(resolved.clone());
                    outcome.resolved.push(resolved);
                }
                Some(resolved) => warn!(
                    "Resolver returned {} for conflicted {} {}, ignoring",
                    resolved.id(),
                    T::KIND.label(),
                    conflict.local.id()
                ),
                None => debug!("Resolver declined {}", conflict.local.id()),
            }
        }

        let mut changes = Vec::with_capacity(uploads.len());
        for entity in &uploads {
            let path = entity.remote_path();
            if let Some(copy) = snapshot.entities.get(entity.id()) {
                if copy.path != path {
                    warn!(
                        "{} {} moved from {} to {}, old copy left in place",
                        T::KIND.label(),
                        entity.id(),
                        copy.path,
                        path
                    );
                }
            }
            changes.push(FileChange {
                path,
                content: entity.encode(),
            });
        }

        if !changes.is_empty() {
            let message = format!("Sync {} {}(s)", changes.len(), T::KIND.label());
            let commit = self.remote.write_files_batch(&changes, &message).await?;
            info!("{} ({})", message, commit);
            outcome.commit = Some(commit);
        }

        for (entity, change) in uploads.iter().zip(&changes) {
            metadata.record(
                T::KIND,
                entity.id(),
                entity.updated_at(),
                ContentHash::from_content(&change.content).into_string(),
            );
        }
        let local_ids: BTreeSet<&str> = local.iter().map(|entity| entity.id()).collect();
        let new_locally = downloads
            .iter()
            .filter(|copy| !local_ids.contains(copy.entity.id()));
        for copy in new_locally.chain(&plan.in_sync) {
            metadata.record(T::KIND, copy.entity.id(), copy.entity.updated_at(), copy.hash.clone());
        }

        outcome.counts.uploaded = changes.len();
        outcome.counts.downloaded = downloads.len();
        outcome.downloaded = downloads.into_iter().map(|copy| copy.entity).collect();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Note, Task};
    use crate::remote::InMemoryRepository;
    use crate::time;
    use chrono::{DateTime, Utc};

    fn at(value: &str) -> DateTime<Utc> {
        time::parse(value).unwrap()
    }

    fn note(id: &str, created: &str, updated: &str) -> Note {
        Note {
            id: id.into(),
            title: format!("Note {id}"),
            content: "body".into(),
            tags: vec![],
            created_at: at(created),
            updated_at: at(updated),
            is_ai_generated: false,
        }
    }

    fn copy(entity: Note) -> RemoteCopy<Note> {
        let text = entity.encode();
        RemoteCopy {
            path: entity.remote_path(),
            hash: ContentHash::from_content(&text).into_string(),
            entity,
        }
    }

    fn snapshot(copies: Vec<Note>) -> RemoteSnapshot<Note> {
        let mut snapshot = RemoteSnapshot::default();
        for entity in copies {
            snapshot.insert(copy(entity));
        }
        snapshot
    }

    fn baseline(entries: &[(&str, &str)]) -> BTreeMap<String, SyncedEntry> {
        entries
            .iter()
            .map(|(id, updated)| {
                (
                    id.to_string(),
                    SyncedEntry {
                        updated_at: at(updated),
                        sha: String::new(),
                    },
                )
            })
            .collect()
    }

    const JAN: &str = "2024-01-01T00:00:00.000Z";
    const FEB: &str = "2024-02-01T00:00:00.000Z";
    const MAR: &str = "2024-03-01T00:00:00.000Z";

    #[test]
    fn test_plan_local_only_uploads_remote_only_downloads() {
        let plan = plan(
            &[note("a", JAN, JAN)],
            &snapshot(vec![note("b", JAN, JAN)]),
            &BTreeMap::new(),
        );
        assert_eq!(plan.uploads.len(), 1);
        assert_eq!(plan.uploads[0].id, "a");
        assert_eq!(plan.downloads.len(), 1);
        assert_eq!(plan.downloads[0].entity.id, "b");
        assert!(plan.conflicts.is_empty());
    }

    #[test]
    fn test_plan_local_edit_uploads() {
        let plan = plan(
            &[note("a", JAN, MAR)],
            &snapshot(vec![note("a", JAN, JAN)]),
            &baseline(&[("a", JAN)]),
        );
        assert_eq!(plan.uploads.len(), 1);
        assert!(plan.downloads.is_empty());
    }

    #[test]
    fn test_plan_remote_edit_downloads() {
        let plan = plan(
            &[note("a", JAN, JAN)],
            &snapshot(vec![note("a", JAN, MAR)]),
            &baseline(&[("a", JAN)]),
        );
        assert!(plan.uploads.is_empty());
        assert_eq!(plan.downloads.len(), 1);
    }

    #[test]
    fn test_plan_both_edited_remote_newer_conflicts() {
        let plan = plan(
            &[note("a", JAN, FEB)],
            &snapshot(vec![note("a", JAN, MAR)]),
            &baseline(&[("a", JAN)]),
        );
        assert_eq!(plan.conflicts.len(), 1);
        assert_eq!(plan.downloads.len(), 1);
        assert_eq!(plan.downloads[0].entity.updated_at, at(MAR));
        assert!(plan.uploads.is_empty());
    }

    #[test]
    fn test_plan_both_edited_local_newer_uploads() {
        let plan = plan(
            &[note("a", JAN, MAR)],
            &snapshot(vec![note("a", JAN, FEB)]),
            &baseline(&[("a", JAN)]),
        );
        assert_eq!(plan.uploads.len(), 1);
        assert!(plan.downloads.is_empty());
        assert!(plan.conflicts.is_empty());
    }

    #[test]
    fn test_plan_equal_timestamps_are_in_sync() {
        let plan = plan(
            &[note("a", JAN, FEB)],
            &snapshot(vec![note("a", JAN, FEB)]),
            &baseline(&[("a", JAN)]),
        );
        assert!(plan.uploads.is_empty());
        assert!(plan.downloads.is_empty());
        assert!(plan.conflicts.is_empty());
        assert_eq!(plan.in_sync.len(), 1);
    }

    #[test]
    fn test_plan_without_baseline_leaves_both_sides_alone() {
        let plan = plan(
            &[note("a", JAN, FEB)],
            &snapshot(vec![note("a", JAN, MAR)]),
            &BTreeMap::new(),
        );
        assert!(plan.uploads.is_empty());
        assert!(plan.downloads.is_empty());
        assert_eq!(plan.skipped, vec!["a".to_string()]);
    }

    #[test]
    fn test_plan_skips_local_when_remote_unreadable() {
        let local = note("a", JAN, JAN);
        let mut remote = RemoteSnapshot::default();
        remote.unreadable.insert(local.remote_path());
        let plan = plan(&[local], &remote, &BTreeMap::new());
        assert!(plan.uploads.is_empty());
        assert_eq!(plan.skipped.len(), 1);

        let mut remote = RemoteSnapshot::<Note>::default();
        remote.unreadable.insert("notes/2024-01/".into());
        assert!(remote.is_unreadable("notes/2024-01/a.md"));
        assert!(!remote.is_unreadable("notes/2024-02/a.md"));
    }

    #[test]
    fn test_snapshot_keeps_newest_duplicate() {
        let mut remote = RemoteSnapshot::default();
        remote.insert(copy(note("a", FEB, MAR)));
        remote.insert(copy(note("a", JAN, JAN)));
        assert_eq!(remote.entities["a"].entity.updated_at, at(MAR));
        assert_eq!(remote.entities["a"].path, "notes/2024-02/a.md");
    }

    #[tokio::test]
    async fn test_discover_descends_month_dirs_and_skips_bad_files() {
        let repo = InMemoryRepository::new();
        let a = note("a", JAN, JAN);
        let b = note("b", FEB, FEB);
        repo.insert(&a.remote_path(), &a.encode());
        repo.insert(&b.remote_path(), &b.encode());
        // Legacy flat layout
        let c = note("c", MAR, MAR);
        repo.insert("notes/2024-03-c.md", &c.encode());
        // Wrong extension and unreadable file
        repo.insert("notes/2024-01/readme.txt", "ignored");
        repo.insert("notes/2024-02/broken.md", "x");
        repo.fail_reads_of("notes/2024-02/broken.md");

        let engine = MergeEngine::new(&repo);
        let found = engine.discover::<Note>().await.unwrap();
        assert_eq!(
            found.entities.keys().cloned().collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert!(found.is_unreadable("notes/2024-02/broken.md"));

        let tasks = engine.discover::<Task>().await.unwrap();
        assert!(tasks.entities.is_empty());
    }

    #[tokio::test]
    async fn test_sync_kind_records_watermarks() {
        let repo = InMemoryRepository::new();
        let remote_only = note("r", JAN, JAN);
        repo.insert(&remote_only.remote_path(), &remote_only.encode());

        let local = note("l", FEB, FEB);
        let mut metadata = SyncMetadata::default();
        let outcome = MergeEngine::new(&repo)
            .sync_kind(&[local.clone()], &mut metadata, None)
            .await
            .unwrap();

        assert_eq!(outcome.counts.uploaded, 1);
        assert_eq!(outcome.counts.downloaded, 1);
        assert_eq!(outcome.downloaded, vec![remote_only]);
        assert_eq!(repo.commits()[0].message, "Sync 1 note(s)");
        assert_eq!(metadata.notes["l"].updated_at, at(FEB));
        assert_eq!(
            metadata.notes["l"].sha,
            ContentHash::from_content(&local.encode()).into_string()
        );
        assert_eq!(metadata.notes["r"].updated_at, at(JAN));
    }

    #[tokio::test]
    async fn test_sync_kind_failed_batch_leaves_metadata() {
        let repo = InMemoryRepository::new();
        repo.set_fail_batches(true);
        let mut metadata = SyncMetadata::default();
        let result = MergeEngine::new(&repo)
            .sync_kind(&[note("a", JAN, JAN)], &mut metadata, None)
            .await;
        assert!(result.is_err());
        assert_eq!(metadata, SyncMetadata::default());
    }

    fn repo_with(remote: &Note) -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        repo.insert(&remote.remote_path(), &remote.encode());
        repo
    }

    fn metadata_with(id: &str, updated: &str) -> SyncMetadata {
        let mut metadata = SyncMetadata::default();
        metadata.record(crate::entity::EntityKind::Note, id, at(updated), String::new());
        metadata
    }

    #[tokio::test]
    async fn test_unresolved_conflict_is_downloaded() {
        let remote = note("a", JAN, MAR);
        let repo = repo_with(&remote);
        let mut metadata = metadata_with("a", JAN);

        let outcome = MergeEngine::new(&repo)
            .sync_kind(&[note("a", JAN, FEB)], &mut metadata, None)
            .await
            .unwrap();
        assert_eq!(outcome.counts.conflicts, 1);
        assert_eq!(outcome.counts.downloaded, 1);
        assert_eq!(outcome.downloaded, vec![remote]);
        assert!(repo.commits().is_empty());
    }

    #[tokio::test]
    async fn test_resolved_conflict_uploads_instead_of_downloading() {
        let repo = repo_with(&note("a", JAN, MAR));
        let mut metadata = metadata_with("a", JAN);
        let local = note("a", JAN, FEB);

        let outcome = MergeEngine::new(&repo)
            .sync_kind(&[local.clone()], &mut metadata, Some(&KeepLocal))
            .await
            .unwrap();
        assert_eq!(outcome.counts.conflicts, 1);
        assert_eq!(outcome.counts.uploaded, 1);
        assert_eq!(outcome.counts.downloaded, 0);
        assert_eq!(outcome.resolved, vec![local.clone()]);
        assert_eq!(repo.content(&local.remote_path()), Some(local.encode()));
    }

    #[tokio::test]
    async fn test_unapplied_download_is_offered_again() {
        let repo = repo_with(&note("a", JAN, MAR));
        let mut metadata = metadata_with("a", JAN);
        let local = note("a", JAN, JAN);
        let engine = MergeEngine::new(&repo);

        let first = engine.sync_kind(&[local.clone()], &mut metadata, None).await.unwrap();
        assert_eq!(first.counts.downloaded, 1);
        assert_eq!(metadata.notes["a"].updated_at, at(JAN));

        // The caller never stored the download
        let second = engine.sync_kind(&[local], &mut metadata, None).await.unwrap();
        assert_eq!(second.counts.downloaded, 1);

        // Once stored, both sides match and the watermark moves
        let third = engine
            .sync_kind(&second.downloaded, &mut metadata, None)
            .await
            .unwrap();
        assert_eq!(third.counts.downloaded, 0);
        assert_eq!(metadata.notes["a"].updated_at, at(MAR));
    }

    #[tokio::test]
    async fn test_sync_kind_ignores_resolver_changing_id() {
        struct Renaming;

        #[async_trait]
        impl ConflictResolver<Note> for Renaming {
            async fn resolve(&self, local: &Note, _remote: &Note) -> Option<Note> {
                let mut other = local.clone();
                other.id = "other".into();
                Some(other)
            }
        }

        let repo = InMemoryRepository::new();
        let remote = note("a", JAN, MAR);
        repo.insert(&remote.remote_path(), &remote.encode());
        let mut metadata = SyncMetadata::default();
        metadata.record(crate::entity::EntityKind::Note, "a", at(JAN), String::new());

        let outcome = MergeEngine::new(&repo)
            .sync_kind(&[note("a", JAN, FEB)], &mut metadata, Some(&Renaming))
            .await
            .unwrap();
        assert_eq!(outcome.counts.conflicts, 1);
        assert_eq!(outcome.counts.uploaded, 0);
        assert!(repo.commits().is_empty());
    }
}
