//! Local entity store abstraction.
//!
//! The device keeps its own copy of every entity in a keyed collection. The
//! sync client never writes it directly; callers feed the downloads a sync
//! returns back in with [`apply_downloads`].

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::entity::SyncEntity;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid record {id}: {message}")]
    Invalid { id: String, message: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Keyed collection of one entity kind.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait EntityStore<T: SyncEntity>: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<T>>;

    /// Insert or replace by ID.
    async fn put(&self, entity: &T) -> Result<()>;

    /// Returns whether anything was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn list_all(&self) -> Result<Vec<T>>;
}

/// In-memory store for testing
pub struct InMemoryStore<T> {
    items: RwLock<BTreeMap<String, T>>,
}

impl<T: SyncEntity> InMemoryStore<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_items(items: impl IntoIterator<Item = T>) -> Self {
        let items = items
            .into_iter()
            .map(|item| (item.id().to_string(), item))
            .collect();
        Self {
            items: RwLock::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: SyncEntity> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl<T: SyncEntity> EntityStore<T> for InMemoryStore<T> {
    async fn get(&self, id: &str) -> Result<Option<T>> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        Ok(items.get(id).cloned())
    }

    async fn put(&self, entity: &T) -> Result<()> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.insert(entity.id().to_string(), entity.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        Ok(items.remove(id).is_some())
    }

    async fn list_all(&self) -> Result<Vec<T>> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        Ok(items.values().cloned().collect())
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl<T: SyncEntity, S: EntityStore<T> + ?Sized> EntityStore<T> for std::sync::Arc<S> {
    async fn get(&self, id: &str) -> Result<Option<T>> {
        (**self).get(id).await
    }

    async fn put(&self, entity: &T) -> Result<()> {
        (**self).put(entity).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        (**self).delete(id).await
    }

    async fn list_all(&self) -> Result<Vec<T>> {
        (**self).list_all().await
    }
}

/// Write entities returned by a sync into the local store.
///
/// An entity is skipped when the local copy is at least as new, so a local
/// edit made while the sync was running survives. Returns how many were
/// written.
pub async fn apply_downloads<T, S>(store: &S, entities: &[T]) -> Result<usize>
where
    T: SyncEntity,
    S: EntityStore<T> + ?Sized,
{
    let mut applied = 0;
    for entity in entities {
        if let Some(local) = store.get(entity.id()).await? {
            if local.updated_at() >= entity.updated_at() {
                debug!("Keeping newer local {} {}", T::KIND.label(), entity.id());
                continue;
            }
        }
        store.put(entity).await?;
        applied += 1;
    }
    Ok(applied)
}
