//! Users, groups and whitelists.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Document, ObjectId};
use crate::storage::Collection;

/// Account rank of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRank {
    #[default]
    User,
    UploadRequested,
    Uploader,
    Admin,
}

impl UserRank {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRank::User => "user",
            UserRank::UploadRequested => "uploadrequested",
            UserRank::Uploader => "uploader",
            UserRank::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public part of a user account, embedded wherever a user is referenced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrippedUser {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub fullname: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StrippedUser {
    pub fn new(id: impl Into<ObjectId>, username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            id: id.into(),
            fullname: username.clone(),
            username,
            extra: Map::new(),
        }
    }
}

/// Owner of an entity or compilation.
pub type RelatedOwner = StrippedUser;

/// A user group that can be placed on a whitelist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub creator: StrippedUser,
    pub owners: Vec<StrippedUser>,
    pub members: Vec<StrippedUser>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Group {
    pub fn new(id: impl Into<ObjectId>, name: impl Into<String>, creator: StrippedUser) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owners: vec![creator.clone()],
            creator,
            ..Default::default()
        }
    }

    /// Effective member set: owners and members.
    pub fn effective_members(&self) -> BTreeSet<&ObjectId> {
        self.owners
            .iter()
            .chain(self.members.iter())
            .map(|u| &u.id)
            .collect()
    }

    pub fn contains(&self, user_id: &ObjectId) -> bool {
        self.owners
            .iter()
            .chain(self.members.iter())
            .any(|u| &u.id == user_id)
    }
}

impl Document for Group {
    const COLLECTION: Collection = Collection::Group;

    fn id(&self) -> &ObjectId {
        &self.id
    }
}

/// Allow-list gating visibility of an entity or compilation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Whitelist {
    pub enabled: bool,
    pub persons: Vec<StrippedUser>,
    pub groups: Vec<Group>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
