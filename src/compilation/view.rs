//! The composed form of a compilation.

use serde::ser::{Error as _, Serializer};
use serde::Serialize;
use serde_json::{json, Value};

use crate::access::Verdict;
use crate::model::{stub_value, Compilation, Entity, ObjectId};
use crate::resolver::ResolveReport;

/// One slot of a composed compilation.
#[derive(Debug, Clone)]
pub enum ComposedEntry {
    /// The caller may see the entity; it is resolved.
    Visible(Box<Entity>),
    /// The entity exists but its own whitelist or password hides it.
    Hidden { id: ObjectId, verdict: Verdict },
    /// The slot was `null` or its target is gone.
    Missing { id: Option<ObjectId> },
}

impl ComposedEntry {
    pub fn id(&self) -> Option<&ObjectId> {
        match self {
            ComposedEntry::Visible(entity) => Some(&entity.id),
            ComposedEntry::Hidden { id, .. } => Some(id),
            ComposedEntry::Missing { id } => id.as_ref(),
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, ComposedEntry::Visible(_))
    }

    /// Wire form: the entity, or an id-only stub. A slot that was `null`
    /// becomes a stub with a `null` id so the array keeps one object per slot.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        match self {
            ComposedEntry::Visible(entity) => serde_json::to_value(entity),
            ComposedEntry::Hidden { id, .. } | ComposedEntry::Missing { id: Some(id) } => {
                Ok(stub_value(id))
            }
            ComposedEntry::Missing { id: None } => Ok(json!({ "_id": Value::Null })),
        }
    }
}

impl PartialEq for ComposedEntry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ComposedEntry::Visible(a), ComposedEntry::Visible(b)) => a.id == b.id,
            (
                ComposedEntry::Hidden { id: a, verdict: va },
                ComposedEntry::Hidden { id: b, verdict: vb },
            ) => a == b && va == vb,
            (ComposedEntry::Missing { id: a }, ComposedEntry::Missing { id: b }) => a == b,
            _ => false,
        }
    }
}

/// A compilation as seen by one caller.
#[derive(Debug, Clone)]
pub struct CompilationView {
    /// The compilation without its `entities`, which live in `entries`.
    pub compilation: Compilation,
    /// One entry per slot of the stored `entities` array, same order.
    pub entries: Vec<ComposedEntry>,
    /// Resolution counters summed over the visible entities.
    pub report: ResolveReport,
}

impl CompilationView {
    pub fn visible_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_visible()).count()
    }

    pub fn hidden_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, ComposedEntry::Hidden { .. }))
            .count()
    }

    pub fn missing_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, ComposedEntry::Missing { .. }))
            .count()
    }

    /// The compilation in wire form with `entities` replaced by the entries.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(&self.compilation)?;
        let entries = self
            .entries
            .iter()
            .map(ComposedEntry::to_value)
            .collect::<serde_json::Result<Vec<_>>>()?;
        if let Value::Object(map) = &mut value {
            map.insert("entities".to_string(), Value::Array(entries));
        }
        Ok(value)
    }
}

impl Serialize for CompilationView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}
