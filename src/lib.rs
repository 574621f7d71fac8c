//! Repograph: entity-relation graph for a digital-object repository
//!
//! Documents (entities, their descriptive metadata, persons, institutions,
//! annotations and compilations) reference each other by id. This crate
//! resolves those references on demand, merges per-owner metadata relations,
//! keeps annotation lists ranked, and decides who may see an entity or a
//! compilation.

pub mod access;
pub mod annotation;
pub mod broadcast;
pub mod compilation;
pub mod config;
pub mod error;
pub mod metadata;
pub mod model;
pub mod resolver;
pub mod storage;

pub use access::{can_view, AccessGuard, AccessPolicy, DenyReason, Guarded, Principal, Verdict};
pub use annotation::{
    AnnotationDelta, AnnotationList, OwnerDocument, RoomChange, RoomRegistry, SocketUser,
};
pub use broadcast::{BroadcastChannel, NullBroadcast, RepositoryEvent, TokioBroadcast};
pub use compilation::{CompilationView, ComposedEntry, Composer, CompositionResult};
pub use config::Config;
pub use error::{
    AccessError, AnnotationError, ConfigError, MetadataError, RepoError, Result, StorageError,
};
pub use metadata::{
    is_orphan, link_owner, unlink_owner, InstitutionRelation, MetadataService, PersonRelation,
    SweepReport, Unlinked,
};
pub use model::{
    Agent, Annotation, Compilation, DigitalEntity, Document, Entity, Group, Institution, ObjectId,
    Password, Person, PhysicalEntity, Reference, StrippedUser, TargetOwner, UserRank, Whitelist,
};
pub use resolver::{FieldKind, FieldSpec, Resolution, ResolveOptions, ResolveReport, Resolver};
pub use storage::{create_store, Collection, DocumentStore, FileStore, MemoryStore};
