//! Visibility of entities and compilations.
//!
//! An object is visible to its owner, to anyone when its whitelist is off
//! and no password is set, to password holders when its whitelist is off,
//! and to listed persons and group members when its whitelist is on.

mod evaluator;
mod policy;
mod whitelist;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Compilation, Document, Entity, ObjectId, UserRank, Whitelist};

pub use evaluator::can_view;
pub use policy::{AccessGuard, AccessPolicy};
pub use whitelist::{add_group, add_person, disable, enable, remove_group, remove_person};

/// Who is asking.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Principal {
    /// No session.
    #[default]
    Anonymous,
    User { id: ObjectId, role: UserRank },
}

impl Principal {
    pub fn user(id: impl Into<ObjectId>, role: UserRank) -> Self {
        Principal::User {
            id: id.into(),
            role,
        }
    }

    pub fn id(&self) -> Option<&ObjectId> {
        match self {
            Principal::Anonymous => None,
            Principal::User { id, .. } => Some(id),
        }
    }

    pub fn role(&self) -> Option<UserRank> {
        match self {
            Principal::Anonymous => None,
            Principal::User { role, .. } => Some(*role),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Anonymous => write!(f, "anonymous"),
            Principal::User { id, role } => write!(f, "user:{} ({})", id, role),
        }
    }
}

/// Why an object is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenyReason {
    Password,
    Whitelist,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Password => write!(f, "password missing or incorrect"),
            DenyReason::Whitelist => write!(f, "not on the whitelist"),
        }
    }
}

/// Outcome of a visibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Allow,
    DenyPassword,
    DenyWhitelist,
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Verdict::Allow => None,
            Verdict::DenyPassword => Some(DenyReason::Password),
            Verdict::DenyWhitelist => Some(DenyReason::Whitelist),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.deny_reason() {
            None => write!(f, "allow"),
            Some(reason) => write!(f, "deny ({})", reason),
        }
    }
}

/// An object whose visibility is gated by ownership, whitelist and password.
pub trait Guarded: Document {
    fn is_owned_by(&self, user: &ObjectId) -> bool;

    fn whitelist(&self) -> &Whitelist;

    /// The password a viewer must supply, if any.
    fn password(&self) -> Option<&str> {
        None
    }
}

impl Guarded for Entity {
    fn is_owned_by(&self, user: &ObjectId) -> bool {
        Entity::is_owned_by(self, user)
    }

    fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    fn password(&self) -> Option<&str> {
        Entity::password(self)
    }
}

impl Guarded for Compilation {
    fn is_owned_by(&self, user: &ObjectId) -> bool {
        self.related_owner.as_ref().is_some_and(|o| &o.id == user)
    }

    fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    fn password(&self) -> Option<&str> {
        Compilation::password(self)
    }
}
