//! Digital object instances and the compilations that group them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Annotation, DigitalEntity, Document, FileRef, ObjectId, Reference, RelatedOwner, Whitelist};
use crate::storage::Collection;

/// A point or direction in object space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Vector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPosition {
    pub position: Vector,
    pub target: Vector,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Background {
    pub color: Color,
    pub effect: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Light {
    #[serde(rename = "type")]
    pub kind: String,
    pub position: Vector,
    pub intensity: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Camera and scene defaults used when the entity is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitySettings {
    pub preview: String,
    #[serde(rename = "cameraPositionInitial")]
    pub camera_position_initial: CameraPosition,
    pub background: Background,
    pub lights: Vec<Light>,
    pub rotation: Vector,
    pub scale: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for EntitySettings {
    fn default() -> Self {
        Self {
            preview: String::new(),
            camera_position_initial: CameraPosition::default(),
            background: Background::default(),
            lights: Vec::new(),
            rotation: Vector::default(),
            scale: 1.0,
            extra: Map::new(),
        }
    }
}

/// Links to derived assets. Opaque to the graph beyond presence checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Processed {
    pub low: String,
    pub medium: String,
    pub high: String,
    pub raw: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Processed {
    pub fn is_complete(&self) -> bool {
        [&self.low, &self.medium, &self.high, &self.raw]
            .iter()
            .all(|link| !link.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSource {
    #[serde(rename = "isExternal")]
    pub is_external: bool,
    pub service: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A digital object instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub files: Vec<FileRef>,
    #[serde(rename = "relatedDigitalEntity")]
    pub related_digital_entity: Reference<DigitalEntity>,
    #[serde(rename = "relatedEntityOwners", default)]
    pub related_entity_owners: Vec<RelatedOwner>,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub finished: bool,
    #[serde(rename = "mediaType", default)]
    pub media_type: String,
    #[serde(rename = "dataSource", default)]
    pub data_source: DataSource,
    #[serde(default)]
    pub processed: Processed,
    /// Ordered by ranking, not by insertion.
    #[serde(rename = "annotationList", default)]
    pub annotation_list: Vec<Option<Reference<Annotation>>>,
    #[serde(default)]
    pub whitelist: Whitelist,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Password>,
    #[serde(default)]
    pub settings: EntitySettings,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity {
    /// Create an entity pointing at its descriptive metadata.
    pub fn new(
        id: impl Into<ObjectId>,
        name: impl Into<String>,
        digital: Reference<DigitalEntity>,
        owner: RelatedOwner,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            files: Vec::new(),
            related_digital_entity: digital,
            related_entity_owners: vec![owner],
            online: false,
            finished: false,
            media_type: String::new(),
            data_source: DataSource::default(),
            processed: Processed::default(),
            annotation_list: Vec::new(),
            whitelist: Whitelist::default(),
            password: None,
            settings: EntitySettings::default(),
            extra: Map::new(),
        }
    }

    pub fn is_owned_by(&self, user_id: &ObjectId) -> bool {
        self.related_entity_owners.iter().any(|o| &o.id == user_id)
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_ref().and_then(Password::secret)
    }
}

impl Document for Entity {
    const COLLECTION: Collection = Collection::Entity;

    fn id(&self) -> &ObjectId {
        &self.id
    }
}

/// Password of an entity or compilation.
///
/// Persisted either as the secret string or as `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Password {
    Secret(String),
    Flag(bool),
}

impl Password {
    /// The secret, if one is actually set.
    pub fn secret(&self) -> Option<&str> {
        match self {
            Password::Secret(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

/// A curated collection of entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compilation {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "relatedOwner", default, skip_serializing_if = "Option::is_none")]
    pub related_owner: Option<RelatedOwner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Password>,
    /// A `None` slot is a reference whose target was deleted.
    #[serde(default)]
    pub entities: Vec<Option<Reference<Entity>>>,
    #[serde(rename = "annotationList", default)]
    pub annotation_list: Vec<Option<Reference<Annotation>>>,
    #[serde(default)]
    pub whitelist: Whitelist,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Compilation {
    pub fn new(id: impl Into<ObjectId>, name: impl Into<String>, owner: RelatedOwner) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            related_owner: Some(owner),
            password: None,
            entities: Vec::new(),
            annotation_list: Vec::new(),
            whitelist: Whitelist::default(),
            extra: Map::new(),
        }
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_ref().and_then(Password::secret)
    }
}

impl Document for Compilation {
    const COLLECTION: Collection = Collection::Compilation;

    fn id(&self) -> &ObjectId {
        &self.id
    }
}
