//! Native entity store: one JSON file per entity, using tokio::fs.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use sync_core::entity::SyncEntity;
use sync_core::store::{EntityStore, Result, StoreError};
use tokio::fs;
use tracing::warn;

/// Entities of one kind under `<root>/<kind>/<id>.json`.
pub struct JsonStore<T> {
    dir: PathBuf,
    _kind: PhantomData<fn() -> T>,
}

impl<T: SyncEntity> JsonStore<T> {
    pub fn new(root: &Path) -> Self {
        Self {
            dir: root.join(T::KIND.dir()),
            _kind: PhantomData,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, id: &str) -> Result<PathBuf> {
        // IDs come from remote files too; keep them inside the store
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
            return Err(StoreError::Invalid {
                id: id.to_string(),
                message: "not usable as a file name".to_string(),
            });
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl<T> EntityStore<T> for JsonStore<T>
where
    T: SyncEntity + Serialize + DeserializeOwned,
{
    async fn get(&self, id: &str) -> Result<Option<T>> {
        let path = self.file_path(id)?;
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StoreError::Invalid {
                id: id.to_string(),
                message: e.to_string(),
            })
    }

    async fn put(&self, entity: &T) -> Result<()> {
        let path = self.file_path(entity.id())?;
        let text = serde_json::to_string_pretty(entity).map_err(|e| StoreError::Invalid {
            id: entity.id().to_string(),
            message: e.to_string(),
        })?;

        fs::create_dir_all(&self.dir).await?;

        // Write then rename so a crash never leaves a half-written entity
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let path = self.file_path(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_all(&self) -> Result<Vec<T>> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entities = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = fs::read_to_string(&path).await?;
            match serde_json::from_str::<T>(&text) {
                Ok(entity) => entities.push(entity),
                Err(e) => warn!("Skipping unreadable {}: {}", path.display(), e),
            }
        }

        entities.sort_by(|a: &T, b: &T| a.id().cmp(b.id()));
        Ok(entities)
    }
}
