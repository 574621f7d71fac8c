//! Wire types for the repository graph.
//!
//! These are the persisted shapes exchanged with the document store. Every
//! document keeps unknown fields in an `extra` map so that reading and
//! writing a document never strips data the graph does not model.

mod annotation;
mod entity;
mod id;
mod metadata;
mod reference;
mod user;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::storage::Collection;

pub use annotation::{
    Agent, Annotation, Body, CameraPerspective, Content, Selector, Source, Target, TargetOwner,
};
pub use entity::{
    Background, CameraPosition, Color, Compilation, DataSource, Entity, EntitySettings, Light,
    Password, Processed, Vector,
};
pub use id::ObjectId;
pub use metadata::{
    Address, ContactReference, Creation, DigitalEntity, Dimension, ExternalId, ExternalLink,
    FileRef, Institution, Person, PhysicalEntity, Place, Tag,
};
pub use reference::{is_stub_value, stub_value, value_id, Reference};
pub use user::{Group, RelatedOwner, StrippedUser, UserRank, Whitelist};

/// A document stored in one collection of the document store.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The collection documents of this type live in.
    const COLLECTION: Collection;

    fn id(&self) -> &ObjectId;
}
