//! Opaque document identifiers.

use std::fmt;

use chrono::Utc;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of a stored document.
///
/// Identifiers are opaque strings. Values that look like 24-character hex
/// object ids are canonicalised to lowercase so that two spellings of the
/// same id compare equal. On the wire an id is either a plain string or an
/// extended-JSON object `{"$oid": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Create an id from its string form.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        if is_object_id_hex(trimmed) {
            Self(trimmed.to_ascii_lowercase())
        } else {
            Self(trimmed.to_string())
        }
    }

    /// Generate a fresh 24-hex id: a 4-byte seconds timestamp followed by
    /// 8 random bytes.
    pub fn generate() -> Self {
        let seconds = Utc::now().timestamp() as u32;
        let random = uuid::Uuid::new_v4();
        let mut id = format!("{:08x}", seconds);
        for byte in &random.as_bytes()[..8] {
            id.push_str(&format!("{:02x}", byte));
        }
        Self(id)
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this id has the 24-hex object id shape.
    pub fn is_object_id(&self) -> bool {
        is_object_id_hex(&self.0)
    }
}

fn is_object_id_hex(s: &str) -> bool {
    s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ObjectIdVisitor)
    }
}

struct ObjectIdVisitor;

impl<'de> Visitor<'de> for ObjectIdVisitor {
    type Value = ObjectId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an id string or an {\"$oid\": ...} object")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ObjectId, E> {
        Ok(ObjectId::new(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<ObjectId, E> {
        Ok(ObjectId::new(v))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ObjectId, A::Error> {
        let mut oid = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == "$oid" {
                oid = Some(map.next_value::<String>()?);
            } else {
                map.next_value::<de::IgnoredAny>()?;
            }
        }
        oid.map(ObjectId::new)
            .ok_or_else(|| de::Error::missing_field("$oid"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_equality() {
        let a = ObjectId::new("5BBF023850C06F445CCAB442");
        let b = ObjectId::new(" 5bbf023850c06f445ccab442 ");
        assert_eq!(a, b);
        assert!(a.is_object_id());

        // Non-hex ids stay opaque and case-sensitive.
        assert_ne!(ObjectId::new("Alice"), ObjectId::new("alice"));
    }

    #[test]
    fn test_generate() {
        let a = ObjectId::generate();
        let b = ObjectId::generate();
        assert!(a.is_object_id());
        assert_ne!(a, b);
    }

    #[test]
    fn test_deserialize_extended_json() {
        let id: ObjectId =
            serde_json::from_str(r#"{"$oid": "5bbf023850c06f445ccab442"}"#).unwrap();
        assert_eq!(id.as_str(), "5bbf023850c06f445ccab442");

        let id: ObjectId = serde_json::from_str(r#""5bbf023850c06f445ccab442""#).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""5bbf023850c06f445ccab442""#);
    }

    #[test]
    fn test_map_keys() {
        let map: std::collections::BTreeMap<ObjectId, u8> =
            serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap();
        let keys: Vec<_> = map.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
