//! Descriptive metadata documents: digital and physical entities and the
//! persons and institutions shared between them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Document, ObjectId, Reference};
use crate::storage::Collection;

/// A file attached to an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRef {
    pub file_name: String,
    pub file_link: String,
    pub file_size: u64,
    pub file_format: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An identifier of the object in some external system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalId {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalLink {
    pub description: String,
    pub value: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Postal address of an institution, scoped to one owning entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub building: String,
    pub number: String,
    pub street: String,
    pub postcode: String,
    pub city: String,
    pub country: String,
    /// Only used to sort addresses.
    pub creation_date: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Contact details of a person, scoped to one owning entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactReference {
    pub mail: String,
    pub phonenumber: String,
    pub note: String,
    /// Only used to sort contact references.
    pub creation_date: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A person contributing to one or more entities.
///
/// Every relation map is keyed by the id of the owning digital or physical
/// entity the relation applies to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub prename: String,
    pub name: String,
    pub roles: BTreeMap<ObjectId, Vec<String>>,
    pub institutions: BTreeMap<ObjectId, Vec<Reference<Institution>>>,
    pub contact_references: BTreeMap<ObjectId, ContactReference>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Person {
    pub fn new(id: impl Into<ObjectId>, prename: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prename: prename.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.prename, self.name).trim().to_string()
    }
}

impl Document for Person {
    const COLLECTION: Collection = Collection::Person;

    fn id(&self) -> &ObjectId {
        &self.id
    }
}

/// An institution contributing to one or more entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Institution {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub university: String,
    pub roles: BTreeMap<ObjectId, Vec<String>>,
    pub notes: BTreeMap<ObjectId, String>,
    pub addresses: BTreeMap<ObjectId, Address>,
    /// Contact persons of the institution.
    pub persons: Vec<Option<Reference<Person>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Institution {
    pub fn new(id: impl Into<ObjectId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Document for Institution {
    const COLLECTION: Collection = Collection::Institution;

    fn id(&self) -> &ObjectId {
        &self.id
    }
}

/// A keyword attached to a digital entity, stored either as a tag document
/// or as plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tag {
    Document {
        #[serde(rename = "_id")]
        id: ObjectId,
        value: String,
    },
    Text(String),
}

impl Tag {
    pub fn value(&self) -> &str {
        match self {
            Tag::Document { value, .. } => value,
            Tag::Text(value) => value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dimension {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Creation {
    pub technique: String,
    pub program: String,
    pub equipment: String,
    pub date: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Descriptive metadata of a digital object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitalEntity {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    #[serde(rename = "externalId")]
    pub external_id: Vec<ExternalId>,
    #[serde(rename = "externalLink")]
    pub external_link: Vec<ExternalLink>,
    pub metadata_files: Vec<FileRef>,
    pub persons: Vec<Option<Reference<Person>>>,
    pub institutions: Vec<Option<Reference<Institution>>>,
    #[serde(rename = "type")]
    pub kind: String,
    pub licence: String,
    pub discipline: Vec<String>,
    pub tags: Vec<Tag>,
    pub dimensions: Vec<Dimension>,
    pub creation: Vec<Creation>,
    pub files: Vec<FileRef>,
    pub statement: String,
    pub objecttype: String,
    #[serde(rename = "phyObjs")]
    pub phy_objs: Vec<Option<Reference<PhysicalEntity>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DigitalEntity {
    pub fn new(id: impl Into<ObjectId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}

impl Document for DigitalEntity {
    const COLLECTION: Collection = Collection::DigitalEntity;

    fn id(&self) -> &ObjectId {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Place {
    pub name: String,
    pub geopolarea: String,
    pub address: Address,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Descriptive metadata of the physical counterpart of a digital object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalEntity {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    #[serde(rename = "externalId")]
    pub external_id: Vec<ExternalId>,
    #[serde(rename = "externalLink")]
    pub external_link: Vec<ExternalLink>,
    pub metadata_files: Vec<FileRef>,
    pub persons: Vec<Option<Reference<Person>>>,
    pub institutions: Vec<Option<Reference<Institution>>>,
    pub place: Place,
    pub collection: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document for PhysicalEntity {
    const COLLECTION: Collection = Collection::PhysicalEntity;

    fn id(&self) -> &ObjectId {
        &self.id
    }
}
