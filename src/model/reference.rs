//! Resolved-or-stub references between documents.

use std::hash::{Hash, Hasher};

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::{Document, ObjectId};

/// A reference to another document.
///
/// A stub carries only the target id and is written as `{"_id": ...}`.
/// A resolved reference carries the full target document. Two references
/// are equal when they point at the same id, whichever form they are in.
#[derive(Debug, Clone)]
pub enum Reference<T> {
    Stub(ObjectId),
    Resolved(T),
}

impl<T: Document> Reference<T> {
    /// Create a stub reference.
    pub fn stub(id: impl Into<ObjectId>) -> Self {
        Reference::Stub(id.into())
    }

    /// The id of the referenced document.
    pub fn id(&self) -> &ObjectId {
        match self {
            Reference::Stub(id) => id,
            Reference::Resolved(doc) => doc.id(),
        }
    }

    pub fn is_stub(&self) -> bool {
        matches!(self, Reference::Stub(_))
    }

    pub fn as_resolved(&self) -> Option<&T> {
        match self {
            Reference::Resolved(doc) => Some(doc),
            Reference::Stub(_) => None,
        }
    }

    pub fn into_resolved(self) -> Option<T> {
        match self {
            Reference::Resolved(doc) => Some(doc),
            Reference::Stub(_) => None,
        }
    }

    /// Downgrade to a stub carrying the same id.
    pub fn to_stub(&self) -> Self {
        Reference::Stub(self.id().clone())
    }
}

impl<T: Document> From<T> for Reference<T> {
    fn from(doc: T) -> Self {
        Reference::Resolved(doc)
    }
}

impl<T: Document> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<T: Document> Eq for Reference<T> {}

impl<T: Document> Hash for Reference<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

/// Whether a wire value is a stub: a bare id string, an extended-JSON id,
/// or an object whose only key is `_id`.
pub fn is_stub_value(value: &Value) -> bool {
    match value {
        Value::String(_) => true,
        Value::Object(map) => {
            (map.len() == 1 && map.contains_key("_id"))
                || (map.len() == 1 && map.contains_key("$oid"))
        }
        _ => false,
    }
}

/// Extract the id of a wire value that is either a stub or a document.
pub fn value_id(value: &Value) -> Option<ObjectId> {
    match value {
        Value::String(s) => Some(ObjectId::new(s)),
        Value::Object(map) => {
            let raw = map.get("_id").or_else(|| map.get("$oid").map(|_| value))?;
            serde_json::from_value(raw.clone()).ok()
        }
        _ => None,
    }
}

/// Wire form of a stub.
pub fn stub_value(id: &ObjectId) -> Value {
    serde_json::json!({ "_id": id })
}

impl<T: Serialize> Serialize for Reference<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reference::Stub(id) => stub_value(id).serialize(serializer),
            Reference::Resolved(doc) => doc.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Reference<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if is_stub_value(&value) {
            let id = value_id(&value).ok_or_else(|| D::Error::custom("stub without an id"))?;
            return Ok(Reference::Stub(id));
        }
        T::deserialize(value)
            .map(Reference::Resolved)
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Person;

    #[test]
    fn test_stub_detection() {
        assert!(is_stub_value(&serde_json::json!("5bbf023850c06f445ccab442")));
        assert!(is_stub_value(&serde_json::json!({"_id": "p1"})));
        assert!(is_stub_value(&serde_json::json!({"$oid": "5bbf023850c06f445ccab442"})));
        assert!(!is_stub_value(&serde_json::json!({"_id": "p1", "name": "Doe"})));
        assert!(!is_stub_value(&Value::Null));
    }

    #[test]
    fn test_value_id() {
        assert_eq!(
            value_id(&serde_json::json!({"$oid": "5BBF023850C06F445CCAB442"})),
            Some(ObjectId::new("5bbf023850c06f445ccab442"))
        );
        assert_eq!(
            value_id(&serde_json::json!({"_id": {"$oid": "5bbf023850c06f445ccab442"}})),
            Some(ObjectId::new("5bbf023850c06f445ccab442"))
        );
        assert_eq!(value_id(&serde_json::json!(3)), None);
    }

    #[test]
    fn test_reference_forms() {
        let stub: Reference<Person> = serde_json::from_str(r#"{"_id": "p1"}"#).unwrap();
        assert!(stub.is_stub());
        assert_eq!(stub.id().as_str(), "p1");

        let resolved: Reference<Person> =
            serde_json::from_str(r#"{"_id": "p1", "prename": "Jane", "name": "Doe"}"#).unwrap();
        assert!(!resolved.is_stub());
        assert_eq!(resolved.as_resolved().unwrap().name, "Doe");

        // Equality is by id only.
        assert_eq!(stub, resolved);
        assert_eq!(serde_json::to_value(resolved.to_stub()).unwrap(), stub_value(stub.id()));
    }
}
