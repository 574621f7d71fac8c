//! Spatial annotations placed on entities and compilations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{Document, ObjectId, Vector};
use crate::error::AnnotationError;
use crate::storage::Collection;

/// Author or tool that produced an annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Agent {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Agent {
    pub fn person(id: impl Into<ObjectId>, name: impl Into<String>) -> Self {
        Self {
            kind: "person".to_string(),
            name: name.into(),
            id: id.into(),
            homepage: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPerspective {
    #[serde(rename = "cameraType")]
    pub camera_type: String,
    pub position: Vector,
    pub target: Vector,
    pub preview: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Content {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(rename = "relatedPerspective", skip_serializing_if = "Option::is_none")]
    pub related_perspective: Option<CameraPerspective>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Body {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Content,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The document an annotation belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(
        rename = "relatedEntity",
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub related_entity: Option<ObjectId>,
    #[serde(
        rename = "relatedCompilation",
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub related_compilation: Option<ObjectId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ObjectId>, D::Error> {
    let id = Option::<ObjectId>::deserialize(deserializer)?;
    Ok(id.filter(|id| !id.as_str().is_empty()))
}

/// Point and surface normal in object space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selector {
    #[serde(rename = "referencePoint")]
    pub reference_point: Vector,
    #[serde(rename = "referenceNormal")]
    pub reference_normal: Vector,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    pub source: Source,
    pub selector: Selector,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Owner of an annotation, taken from its target source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum TargetOwner {
    Entity(ObjectId),
    Compilation(ObjectId),
}

impl TargetOwner {
    pub fn id(&self) -> &ObjectId {
        match self {
            TargetOwner::Entity(id) | TargetOwner::Compilation(id) => id,
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            TargetOwner::Entity(_) => Collection::Entity,
            TargetOwner::Compilation(_) => Collection::Compilation,
        }
    }
}

/// A user-authored annotation anchored to a point on an entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotation {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub validated: bool,
    pub identifier: String,
    /// Display order within the owning list. Gaps are allowed.
    pub ranking: i64,
    pub creator: Agent,
    pub created: String,
    pub generator: Agent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,
    pub motivation: String,
    #[serde(rename = "lastModificationDate", skip_serializing_if = "Option::is_none")]
    pub last_modification_date: Option<String>,
    #[serde(rename = "lastModifiedBy")]
    pub last_modified_by: Agent,
    pub body: Body,
    pub target: Target,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Annotation {
    /// Create an annotation on an entity, authored now.
    pub fn new(id: impl Into<ObjectId>, ranking: i64, creator: Agent, owner: TargetOwner) -> Self {
        let id = id.into();
        let mut source = Source::default();
        match owner {
            TargetOwner::Entity(entity) => source.related_entity = Some(entity),
            TargetOwner::Compilation(compilation) => {
                source.related_compilation = Some(compilation)
            }
        }
        Self {
            identifier: id.to_string(),
            id,
            ranking,
            generator: creator.clone(),
            last_modified_by: creator.clone(),
            creator,
            created: Utc::now().to_rfc3339(),
            motivation: "defaultMotivation".to_string(),
            target: Target {
                source,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Creation time, when the stored value is a valid RFC 3339 timestamp.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// The entity or compilation this annotation belongs to.
    pub fn target_owner(&self) -> Result<TargetOwner, AnnotationError> {
        let source = &self.target.source;
        match (&source.related_entity, &source.related_compilation) {
            (Some(entity), None) => Ok(TargetOwner::Entity(entity.clone())),
            (None, Some(compilation)) => Ok(TargetOwner::Compilation(compilation.clone())),
            (Some(_), Some(_)) => Err(AnnotationError::InvalidTarget(format!(
                "annotation {} references both an entity and a compilation",
                self.id
            ))),
            (None, None) => Err(AnnotationError::InvalidTarget(format!(
                "annotation {} has no related entity or compilation",
                self.id
            ))),
        }
    }

    /// Check the target invariant.
    pub fn validate(&self) -> Result<(), AnnotationError> {
        self.target_owner().map(|_| ())
    }
}

impl Document for Annotation {
    const COLLECTION: Collection = Collection::Annotation;

    fn id(&self) -> &ObjectId {
        &self.id
    }
}
