//! Reference fields of each collection.

use crate::error::StorageError;
use crate::model::{
    Annotation, Compilation, DigitalEntity, Entity, Group, Institution, Person, PhysicalEntity,
};
use crate::storage::{Collection, StoredDocument};

/// Shape of a reference field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A single reference. A missing target leaves the stub in place.
    Single,
    /// An array of references. A missing target becomes `null`.
    Array,
    /// A relation map from owner id to an array of references. Missing
    /// targets are dropped, and an owner key left with no references is
    /// removed.
    MapOfArrays,
}

/// One reference field of a document and the collection it points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub target: Collection,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind, target: Collection) -> Self {
        Self { name, kind, target }
    }
}

const ENTITY_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(
        "relatedDigitalEntity",
        FieldKind::Single,
        Collection::DigitalEntity,
    ),
    FieldSpec::new("annotationList", FieldKind::Array, Collection::Annotation),
];

const COMPILATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("entities", FieldKind::Array, Collection::Entity),
    FieldSpec::new("annotationList", FieldKind::Array, Collection::Annotation),
];

const DIGITAL_ENTITY_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("persons", FieldKind::Array, Collection::Person),
    FieldSpec::new("institutions", FieldKind::Array, Collection::Institution),
    FieldSpec::new("phyObjs", FieldKind::Array, Collection::PhysicalEntity),
];

const PHYSICAL_ENTITY_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("persons", FieldKind::Array, Collection::Person),
    FieldSpec::new("institutions", FieldKind::Array, Collection::Institution),
];

const PERSON_FIELDS: &[FieldSpec] = &[FieldSpec::new(
    "institutions",
    FieldKind::MapOfArrays,
    Collection::Institution,
)];

const INSTITUTION_FIELDS: &[FieldSpec] =
    &[FieldSpec::new("persons", FieldKind::Array, Collection::Person)];

/// Reference fields of documents in `collection`.
pub fn field_specs(collection: Collection) -> &'static [FieldSpec] {
    match collection {
        Collection::Entity => ENTITY_FIELDS,
        Collection::Compilation => COMPILATION_FIELDS,
        Collection::DigitalEntity => DIGITAL_ENTITY_FIELDS,
        Collection::PhysicalEntity => PHYSICAL_ENTITY_FIELDS,
        Collection::Person => PERSON_FIELDS,
        Collection::Institution => INSTITUTION_FIELDS,
        Collection::Annotation | Collection::Group => &[],
    }
}

/// Check that a fetched document has the shape its collection expects.
pub fn check_shape(stored: &StoredDocument) -> Result<(), StorageError> {
    match stored.collection {
        Collection::Person => stored.decode::<Person>().map(drop),
        Collection::Institution => stored.decode::<Institution>().map(drop),
        Collection::DigitalEntity => stored.decode::<DigitalEntity>().map(drop),
        Collection::PhysicalEntity => stored.decode::<PhysicalEntity>().map(drop),
        Collection::Entity => stored.decode::<Entity>().map(drop),
        Collection::Compilation => stored.decode::<Compilation>().map(drop),
        Collection::Annotation => stored.decode::<Annotation>().map(drop),
        Collection::Group => stored.decode::<Group>().map(drop),
    }
}
