//! Relation edits against the document store.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::merge::{is_orphan, link_owner, unlink_owner, RelationHolder};
use crate::config::MetadataConfig;
use crate::error::{MetadataError, Result, StorageError};
use crate::model::{Document, ObjectId};
use crate::storage::{load, save, DocumentStore};

/// Result of one read-modify-write step.
pub(crate) enum Edit<R> {
    Changed(R),
    Unchanged(R),
}

/// Read a document, apply `edit` and write it back at the revision it was
/// read at. Conflicting writes are retried on a fresh read.
///
/// Returns `None` when the document does not exist.
pub(crate) async fn update_with_retry<T, R, F>(
    store: &dyn DocumentStore,
    id: &ObjectId,
    max_retries: usize,
    mut edit: F,
) -> Result<Option<R>>
where
    T: Document,
    F: FnMut(&mut T) -> Edit<R> + Send,
    R: Send,
{
    let attempts = max_retries.max(1);
    for attempt in 1..=attempts {
        let Some(current) = load::<T>(store, id).await? else {
            return Ok(None);
        };
        let mut document = current.document;

        let outcome = match edit(&mut document) {
            Edit::Unchanged(outcome) => return Ok(Some(outcome)),
            Edit::Changed(outcome) => outcome,
        };

        match save(store, &document, Some(current.revision)).await {
            Ok(revision) => {
                debug!("Wrote {}/{} at revision {}", T::COLLECTION, id, revision);
                return Ok(Some(outcome));
            }
            Err(e) if e.is_conflict() => {
                warn!(
                    "Conflicting write on {}/{} (attempt {}/{}), retrying",
                    T::COLLECTION,
                    id,
                    attempt,
                    attempts
                );
            }
            Err(e) => return Err(e),
        }
    }

    Err(MetadataError::RetriesExhausted {
        collection: T::COLLECTION,
        id: id.clone(),
        attempts,
    }
    .into())
}

/// Outcome of removing one owner from a shared record.
#[derive(Debug, Clone, PartialEq)]
pub struct Unlinked<R> {
    /// The entry that was removed, if the owner was linked.
    pub removed: Option<R>,
    /// Whether the record has no owners left. Deletion is left to
    /// [`sweep_orphans`](super::sweep_orphans).
    pub orphan: bool,
}

/// Links and unlinks owners on persons and institutions held in a store.
#[derive(Clone)]
pub struct MetadataService {
    store: Arc<dyn DocumentStore>,
    max_retries: usize,
}

impl MetadataService {
    pub fn new(store: Arc<dyn DocumentStore>, config: &MetadataConfig) -> Self {
        Self {
            store,
            max_retries: config.max_retries,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Add or overwrite an owner's relation entry, returning the previous one.
    pub async fn link<H>(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        relation: H::Relation,
    ) -> Result<Option<H::Relation>>
    where
        H: RelationHolder,
        H::Relation: Send + Sync,
    {
        let outcome = update_with_retry::<H, _, _>(
            self.store.as_ref(),
            id,
            self.max_retries,
            |holder: &mut H| Edit::Changed(link_owner(holder, owner.clone(), relation.clone())),
        )
        .await?;

        match outcome {
            Some(previous) => {
                info!("Linked {}/{} to owner {}", H::COLLECTION, id, owner);
                Ok(previous)
            }
            None => Err(StorageError::NotFound {
                collection: H::COLLECTION,
                id: id.clone(),
            }
            .into()),
        }
    }

    /// Remove an owner's entry from every relation map of a record.
    ///
    /// A record that is already gone unlinks as a no-op orphan.
    pub async fn unlink<H>(&self, id: &ObjectId, owner: &ObjectId) -> Result<Unlinked<H::Relation>>
    where
        H: RelationHolder,
        H::Relation: Send,
    {
        let outcome = update_with_retry::<H, _, _>(
            self.store.as_ref(),
            id,
            self.max_retries,
            |holder: &mut H| {
                let removed = unlink_owner(holder, owner);
                let unlinked = Unlinked {
                    orphan: is_orphan(holder),
                    removed,
                };
                if unlinked.removed.is_some() {
                    Edit::Changed(unlinked)
                } else {
                    Edit::Unchanged(unlinked)
                }
            },
        )
        .await?;

        let unlinked = outcome.unwrap_or(Unlinked {
            removed: None,
            orphan: true,
        });
        if unlinked.orphan {
            info!("{}/{} has no owners left", H::COLLECTION, id);
        }
        Ok(unlinked)
    }

    /// Whether a stored record has no owners. Missing records count as
    /// orphans.
    pub async fn is_orphan<H: RelationHolder>(&self, id: &ObjectId) -> Result<bool> {
        Ok(load::<H>(self.store.as_ref(), id)
            .await?
            .map_or(true, |current| is_orphan(&current.document)))
    }
}
