//! In-memory document store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::{Collection, DocumentStore, StoredDocument};
use crate::error::{Result, StorageError};
use crate::model::ObjectId;

/// In-memory document store for tests and single-process deployments.
pub struct MemoryStore {
    documents: RwLock<BTreeMap<(Collection, ObjectId), StoredDocument>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Build a store from previously persisted documents.
    pub fn from_documents(documents: impl IntoIterator<Item = StoredDocument>) -> Self {
        let store = Self::new();
        {
            let mut map = store.documents.write();
            for doc in documents {
                map.insert((doc.collection, doc.id.clone()), doc);
            }
        }
        store
    }

    /// Snapshot of every stored document.
    pub fn snapshot(&self) -> Vec<StoredDocument> {
        self.documents.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Simulate the store becoming unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Unreachable("memory store is offline".to_string()).into());
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_by_id(
        &self,
        collection: Collection,
        id: &ObjectId,
    ) -> Result<Option<StoredDocument>> {
        self.ensure_reachable()?;
        let documents = self.documents.read();
        Ok(documents.get(&(collection, id.clone())).cloned())
    }

    async fn put_by_id(
        &self,
        collection: Collection,
        id: &ObjectId,
        body: Value,
        expected_revision: Option<u64>,
    ) -> Result<u64> {
        self.ensure_reachable()?;
        let mut documents = self.documents.write();
        let key = (collection, id.clone());
        let current = documents.get(&key).map(|d| d.revision).unwrap_or(0);

        if let Some(expected) = expected_revision {
            if expected != current {
                return Err(StorageError::Conflict {
                    collection,
                    id: id.clone(),
                    expected,
                    actual: current,
                }
                .into());
            }
        }

        let revision = current + 1;
        documents.insert(
            key,
            StoredDocument {
                collection,
                id: id.clone(),
                revision,
                body,
            },
        );
        Ok(revision)
    }

    async fn delete_by_id(
        &self,
        collection: Collection,
        id: &ObjectId,
        expected_revision: Option<u64>,
    ) -> Result<bool> {
        self.ensure_reachable()?;
        let mut documents = self.documents.write();
        let key = (collection, id.clone());
        let Some(current) = documents.get(&key).map(|d| d.revision) else {
            return Ok(false);
        };

        if let Some(expected) = expected_revision {
            if expected != current {
                return Err(StorageError::Conflict {
                    collection,
                    id: id.clone(),
                    expected,
                    actual: current,
                }
                .into());
            }
        }

        documents.remove(&key);
        Ok(true)
    }

    async fn list_ids(&self, collection: Collection) -> Result<Vec<ObjectId>> {
        self.ensure_reachable()?;
        let documents = self.documents.read();
        Ok(documents
            .keys()
            .filter(|(c, _)| *c == collection)
            .map(|(_, id)| id.clone())
            .collect())
    }
}
