//! Metadata merge engine.
//!
//! Persons and institutions are shared between the entities that reference
//! them. This module edits their per-owner relation maps, in memory
//! ([`link_owner`], [`unlink_owner`], [`is_orphan`]) and against a store with
//! revision checks ([`MetadataService`]), and runs the maintenance sweeps
//! that remove orphans and dangling references afterwards.

mod merge;
mod service;
mod sweep;

pub use merge::{
    is_orphan, link_owner, link_person, unlink_owner, InstitutionRelation, PersonRelation,
    RelationHolder,
};
pub use service::{MetadataService, Unlinked};
pub use sweep::{prune_compilation, prune_entity, sweep_orphans, SweepReport};
