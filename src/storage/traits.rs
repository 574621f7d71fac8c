//! Storage trait definitions.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StorageError};
use crate::model::{Document, ObjectId};

/// Collections of the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Person,
    Institution,
    DigitalEntity,
    PhysicalEntity,
    Entity,
    Compilation,
    Annotation,
    Group,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Person,
        Collection::Institution,
        Collection::DigitalEntity,
        Collection::PhysicalEntity,
        Collection::Entity,
        Collection::Compilation,
        Collection::Annotation,
        Collection::Group,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Person => "person",
            Collection::Institution => "institution",
            Collection::DigitalEntity => "digitalentity",
            Collection::PhysicalEntity => "physicalentity",
            Collection::Entity => "entity",
            Collection::Compilation => "compilation",
            Collection::Annotation => "annotation",
            Collection::Group => "group",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| format!("unknown collection: {}", s))
    }
}

/// A stored document with its revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub collection: Collection,
    pub id: ObjectId,
    /// Incremented on every write, starting at 1.
    pub revision: u64,
    pub body: Value,
}

impl StoredDocument {
    /// Decode the body into a typed document.
    pub fn decode<T: Document>(&self) -> std::result::Result<T, StorageError> {
        if self.collection != T::COLLECTION {
            return Err(StorageError::InvalidReference {
                id: self.id.clone(),
                expected: T::COLLECTION,
                reason: format!("found a {} document", self.collection),
            });
        }
        serde_json::from_value(self.body.clone()).map_err(|e| StorageError::InvalidReference {
            id: self.id.clone(),
            expected: T::COLLECTION,
            reason: e.to_string(),
        })
    }
}

/// A typed document and the revision it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub revision: u64,
    pub document: T,
}

/// Trait for document store backends.
///
/// Writes are compare-and-swap on the document revision when an expected
/// revision is given. `Some(0)` means the document must not exist yet.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Get a document by id.
    async fn get_by_id(&self, collection: Collection, id: &ObjectId)
        -> Result<Option<StoredDocument>>;

    /// Write a document, returning its new revision.
    async fn put_by_id(
        &self,
        collection: Collection,
        id: &ObjectId,
        body: Value,
        expected_revision: Option<u64>,
    ) -> Result<u64>;

    /// Delete a document. Returns false when there was nothing to delete.
    ///
    /// With an expected revision the delete only happens if the document is
    /// still at that revision.
    async fn delete_by_id(
        &self,
        collection: Collection,
        id: &ObjectId,
        expected_revision: Option<u64>,
    ) -> Result<bool>;

    /// List the ids of a collection in id order.
    async fn list_ids(&self, collection: Collection) -> Result<Vec<ObjectId>>;
}

/// Load a typed document.
pub async fn load<T: Document>(
    store: &dyn DocumentStore,
    id: &ObjectId,
) -> Result<Option<Versioned<T>>> {
    match store.get_by_id(T::COLLECTION, id).await? {
        Some(stored) => Ok(Some(Versioned {
            revision: stored.revision,
            document: stored.decode()?,
        })),
        None => Ok(None),
    }
}

/// Save a typed document, returning its new revision.
pub async fn save<T: Document>(
    store: &dyn DocumentStore,
    document: &T,
    expected_revision: Option<u64>,
) -> Result<u64> {
    let body = serde_json::to_value(document)?;
    store
        .put_by_id(T::COLLECTION, document.id(), body, expected_revision)
        .await
}
