//! Edits to an annotation list, as broadcast to collaborators.

use serde::{Deserialize, Serialize};

use crate::model::{Annotation, ObjectId};

/// One edit to an annotation list.
///
/// Collaborators apply deltas in the order they were sequenced rather than
/// replacing the whole list, so concurrent edits are not lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum AnnotationDelta {
    Attach { annotation: Box<Annotation> },
    Detach { id: ObjectId },
    Reorder { id: ObjectId, from: i64, to: i64 },
}

impl AnnotationDelta {
    /// The annotation the delta is about.
    pub fn annotation_id(&self) -> &ObjectId {
        match self {
            AnnotationDelta::Attach { annotation } => &annotation.id,
            AnnotationDelta::Detach { id } | AnnotationDelta::Reorder { id, .. } => id,
        }
    }

    /// The delta that undoes this one, where one exists.
    pub fn inverse(&self) -> Option<AnnotationDelta> {
        match self {
            AnnotationDelta::Attach { annotation } => Some(AnnotationDelta::Detach {
                id: annotation.id.clone(),
            }),
            AnnotationDelta::Reorder { id, from, to } => Some(AnnotationDelta::Reorder {
                id: id.clone(),
                from: *to,
                to: *from,
            }),
            AnnotationDelta::Detach { .. } => None,
        }
    }
}
