//! JSON-file backed document store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;

use super::{Collection, DocumentStore, MemoryStore, StoredDocument};
use crate::error::{RepoError, Result, StorageError};
use crate::model::ObjectId;

/// On-disk layout of the store.
#[derive(Debug, Serialize, Deserialize)]
struct PersistenceData {
    version: u32,
    documents: Vec<StoredDocument>,
}

/// Document store that keeps documents in memory and persists every
/// write to a single JSON file.
pub struct FileStore {
    inner: MemoryStore,
    path: PathBuf,
    persist_lock: AsyncMutex<()>,
}

impl FileStore {
    /// Open (or create) the store under `data_dir`.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(StorageError::Io)?;

        let path = data_dir.join("documents.json");
        let inner = if path.exists() {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(StorageError::Io)?;
            let persisted: PersistenceData =
                serde_json::from_str(&content).map_err(RepoError::Serialization)?;
            tracing::info!(
                "Loaded {} documents from {}",
                persisted.documents.len(),
                path.display()
            );
            MemoryStore::from_documents(persisted.documents)
        } else {
            MemoryStore::new()
        };

        Ok(Self {
            inner,
            path,
            persist_lock: AsyncMutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<()> {
        let _lock = self.persist_lock.lock().await;

        let persisted = PersistenceData {
            version: 1,
            documents: self.inner.snapshot(),
        };
        let content = serde_json::to_string_pretty(&persisted)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(StorageError::Io)?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(StorageError::Io)?;

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get_by_id(
        &self,
        collection: Collection,
        id: &ObjectId,
    ) -> Result<Option<StoredDocument>> {
        self.inner.get_by_id(collection, id).await
    }

    async fn put_by_id(
        &self,
        collection: Collection,
        id: &ObjectId,
        body: Value,
        expected_revision: Option<u64>,
    ) -> Result<u64> {
        let revision = self
            .inner
            .put_by_id(collection, id, body, expected_revision)
            .await?;
        self.persist().await?;
        Ok(revision)
    }

    async fn delete_by_id(
        &self,
        collection: Collection,
        id: &ObjectId,
        expected_revision: Option<u64>,
    ) -> Result<bool> {
        let removed = self
            .inner
            .delete_by_id(collection, id, expected_revision)
            .await?;
        if removed {
            self.persist().await?;
        }
        Ok(removed)
    }

    async fn list_ids(&self, collection: Collection) -> Result<Vec<ObjectId>> {
        self.inner.list_ids(collection).await
    }
}
