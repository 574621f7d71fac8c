//! Maintenance sweeps.
//!
//! Unlinking an owner and removing a referenced document both leave
//! debris behind: orphaned persons and institutions, and `null` slots in
//! reference arrays. Neither is cleaned up as part of the triggering edit.
//! These sweeps are run separately by whoever owns the store.

use futures::future;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::merge::{is_orphan, RelationHolder};
use super::service::{update_with_retry, Edit};
use crate::error::Result;
use crate::model::{Compilation, Document, Entity, Institution, ObjectId, Person, Reference};
use crate::storage::{load, Collection, DocumentStore};

/// What a sweep found and removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Records checked.
    pub checked: usize,
    /// Orphans found, in collection and id order. Records that changed
    /// before they could be deleted are left out.
    pub orphans: Vec<(Collection, ObjectId)>,
    /// Orphans actually deleted. Equal to `orphans` unless this was a dry run.
    pub deleted: usize,
}

/// Delete every person and institution no owner links to any more.
///
/// With `dry_run` the orphans are reported but kept.
pub async fn sweep_orphans(store: &dyn DocumentStore, dry_run: bool) -> Result<SweepReport> {
    let mut report = SweepReport::default();
    sweep_collection::<Person>(store, dry_run, &mut report).await?;
    sweep_collection::<Institution>(store, dry_run, &mut report).await?;
    info!(
        "Orphan sweep checked {} records, found {} orphans, deleted {}",
        report.checked,
        report.orphans.len(),
        report.deleted
    );
    Ok(report)
}

async fn sweep_collection<H: RelationHolder>(
    store: &dyn DocumentStore,
    dry_run: bool,
    report: &mut SweepReport,
) -> Result<()> {
    for id in store.list_ids(H::COLLECTION).await? {
        let Some(stored) = store.get_by_id(H::COLLECTION, &id).await? else {
            continue;
        };
        let holder = match stored.decode::<H>() {
            Ok(holder) => holder,
            Err(e) => {
                warn!("Skipping {}/{}: {}", H::COLLECTION, id, e);
                continue;
            }
        };
        report.checked += 1;

        if !is_orphan(&holder) {
            let owners: Vec<String> = holder
                .owner_ids()
                .iter()
                .map(ToString::to_string)
                .collect();
            debug!("Keeping {}/{}: owners [{}]", H::COLLECTION, id, owners.join(", "));
            continue;
        }

        info!("Orphaned {}/{}", H::COLLECTION, id);
        if dry_run {
            report.orphans.push((H::COLLECTION, id));
            continue;
        }
        // Only delete the revision that was checked.
        match store
            .delete_by_id(H::COLLECTION, &id, Some(stored.revision))
            .await
        {
            Ok(deleted) => {
                report.orphans.push((H::COLLECTION, id));
                if deleted {
                    report.deleted += 1;
                }
            }
            Err(e) if e.is_conflict() => {
                info!("{}/{} changed during the sweep, kept", H::COLLECTION, id);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Whether a reference slot still points at a live document.
async fn slot_is_live<T: Document>(
    store: &dyn DocumentStore,
    slot: &Option<Reference<T>>,
) -> Result<bool> {
    match slot {
        None => Ok(false),
        Some(Reference::Resolved(_)) => Ok(true),
        Some(Reference::Stub(id)) => Ok(store.get_by_id(T::COLLECTION, id).await?.is_some()),
    }
}

/// Ids of stubs in `slots` whose targets are gone.
async fn dead_stubs<T: Document>(
    store: &dyn DocumentStore,
    slots: &[Option<Reference<T>>],
) -> Result<Vec<ObjectId>> {
    let live = future::try_join_all(slots.iter().map(|slot| slot_is_live(store, slot))).await?;
    Ok(slots
        .iter()
        .zip(live)
        .filter_map(|(slot, live)| match slot {
            Some(reference) if !live => Some(reference.id().clone()),
            _ => None,
        })
        .collect())
}

fn retain_live<T: Document>(
    slots: &mut Vec<Option<Reference<T>>>,
    dead: &[ObjectId],
) -> usize {
    let before = slots.len();
    slots.retain(|slot| match slot {
        None => false,
        Some(reference) => !dead.contains(reference.id()),
    });
    before - slots.len()
}

/// Remove `null` and dangling entries from a compilation's `entities` and
/// `annotationList`. Returns the number of entries removed, or `None` when
/// the compilation does not exist.
pub async fn prune_compilation(
    store: &dyn DocumentStore,
    id: &ObjectId,
    max_retries: usize,
) -> Result<Option<usize>> {
    let Some(current) = load::<Compilation>(store, id).await? else {
        return Ok(None);
    };
    let dead_entities = dead_stubs(store, &current.document.entities).await?;
    let dead_annotations = dead_stubs(store, &current.document.annotation_list).await?;

    let pruned = update_with_retry::<Compilation, _, _>(store, id, max_retries, |compilation| {
        let removed = retain_live(&mut compilation.entities, &dead_entities)
            + retain_live(&mut compilation.annotation_list, &dead_annotations);
        if removed > 0 {
            Edit::Changed(removed)
        } else {
            Edit::Unchanged(0)
        }
    })
    .await?;

    if let Some(removed) = pruned {
        info!("Pruned {} dangling entries from compilation {}", removed, id);
    }
    Ok(pruned)
}

/// Remove `null` and dangling entries from an entity's `annotationList`.
pub async fn prune_entity(
    store: &dyn DocumentStore,
    id: &ObjectId,
    max_retries: usize,
) -> Result<Option<usize>> {
    let Some(current) = load::<Entity>(store, id).await? else {
        return Ok(None);
    };
    let dead = dead_stubs(store, &current.document.annotation_list).await?;

    let pruned = update_with_retry::<Entity, _, _>(store, id, max_retries, |entity| {
        match retain_live(&mut entity.annotation_list, &dead) {
            0 => Edit::Unchanged(0),
            removed => Edit::Changed(removed),
        }
    })
    .await?;

    if let Some(removed) = pruned {
        info!("Pruned {} dangling entries from entity {}", removed, id);
    }
    Ok(pruned)
}
