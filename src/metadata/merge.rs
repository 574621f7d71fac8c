//! Relation-map merging for persons and institutions.
//!
//! A person or institution is shared by every entity that references it.
//! What differs per entity (roles, contact details, addresses, notes) lives
//! in relation maps keyed by the owning entity's id. Linking writes one
//! owner's entry into every map; unlinking removes it from every map.

use std::collections::BTreeMap;

use crate::model::{Address, ContactReference, Document, Institution, ObjectId, Person, Reference};

/// Everything a person records about one owning entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonRelation {
    pub roles: Vec<String>,
    pub institutions: Option<Vec<Reference<Institution>>>,
    pub contact_reference: Option<ContactReference>,
}

/// Everything an institution records about one owning entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstitutionRelation {
    pub roles: Vec<String>,
    pub note: Option<String>,
    pub address: Option<Address>,
}

/// A shared document holding per-owner relation maps.
pub trait RelationHolder: Document {
    type Relation: Clone;

    /// Owner ids in ascending order, taken from the `roles` map.
    fn owner_ids(&self) -> Vec<ObjectId>;

    /// The entry for one owner, if any map has one.
    fn relation(&self, owner: &ObjectId) -> Option<Self::Relation>;

    /// Write an owner's entry into every relation map.
    fn insert_relation(&mut self, owner: ObjectId, relation: Self::Relation);

    /// Remove an owner's entry from every relation map.
    fn remove_relation(&mut self, owner: &ObjectId) -> Option<Self::Relation>;

    /// Number of owner keys in the `roles` map.
    fn owner_count(&self) -> usize;
}

impl RelationHolder for Person {
    type Relation = PersonRelation;

    fn owner_ids(&self) -> Vec<ObjectId> {
        self.roles.keys().cloned().collect()
    }

    fn relation(&self, owner: &ObjectId) -> Option<PersonRelation> {
        let roles = self.roles.get(owner);
        let institutions = self.institutions.get(owner);
        let contact = self.contact_references.get(owner);
        if roles.is_none() && institutions.is_none() && contact.is_none() {
            return None;
        }
        Some(PersonRelation {
            roles: roles.cloned().unwrap_or_default(),
            institutions: institutions.cloned(),
            contact_reference: contact.cloned(),
        })
    }

    fn insert_relation(&mut self, owner: ObjectId, relation: PersonRelation) {
        set_or_clear(&mut self.institutions, &owner, relation.institutions);
        set_or_clear(&mut self.contact_references, &owner, relation.contact_reference);
        self.roles.insert(owner, relation.roles);
    }

    fn remove_relation(&mut self, owner: &ObjectId) -> Option<PersonRelation> {
        let removed = self.relation(owner);
        self.roles.remove(owner);
        self.institutions.remove(owner);
        self.contact_references.remove(owner);
        removed
    }

    fn owner_count(&self) -> usize {
        self.roles.len()
    }
}

impl RelationHolder for Institution {
    type Relation = InstitutionRelation;

    fn owner_ids(&self) -> Vec<ObjectId> {
        self.roles.keys().cloned().collect()
    }

    fn relation(&self, owner: &ObjectId) -> Option<InstitutionRelation> {
        let roles = self.roles.get(owner);
        let note = self.notes.get(owner);
        let address = self.addresses.get(owner);
        if roles.is_none() && note.is_none() && address.is_none() {
            return None;
        }
        Some(InstitutionRelation {
            roles: roles.cloned().unwrap_or_default(),
            note: note.cloned(),
            address: address.cloned(),
        })
    }

    fn insert_relation(&mut self, owner: ObjectId, relation: InstitutionRelation) {
        set_or_clear(&mut self.notes, &owner, relation.note);
        set_or_clear(&mut self.addresses, &owner, relation.address);
        self.roles.insert(owner, relation.roles);
    }

    fn remove_relation(&mut self, owner: &ObjectId) -> Option<InstitutionRelation> {
        let removed = self.relation(owner);
        self.roles.remove(owner);
        self.notes.remove(owner);
        self.addresses.remove(owner);
        removed
    }

    fn owner_count(&self) -> usize {
        self.roles.len()
    }
}

fn set_or_clear<V>(map: &mut BTreeMap<ObjectId, V>, owner: &ObjectId, value: Option<V>) {
    match value {
        Some(value) => {
            map.insert(owner.clone(), value);
        }
        None => {
            map.remove(owner);
        }
    }
}

/// Add or overwrite the entry for `owner` in every relation map.
///
/// Returns the entry that was replaced, if any.
pub fn link_owner<H: RelationHolder>(
    holder: &mut H,
    owner: ObjectId,
    relation: H::Relation,
) -> Option<H::Relation> {
    let previous = holder.relation(&owner);
    holder.insert_relation(owner, relation);
    previous
}

/// Remove the entry for `owner` from every relation map.
///
/// Never deletes the holder itself, even when it becomes an orphan.
pub fn unlink_owner<H: RelationHolder>(holder: &mut H, owner: &ObjectId) -> Option<H::Relation> {
    holder.remove_relation(owner)
}

/// Whether no owner references the holder any more.
pub fn is_orphan<H: RelationHolder>(holder: &H) -> bool {
    holder.owner_count() == 0
}

/// Link a person to an owning entity.
pub fn link_person(
    person: &mut Person,
    owner: ObjectId,
    roles: Vec<String>,
    contact: Option<ContactReference>,
) -> Option<PersonRelation> {
    let institutions = person.institutions.get(&owner).cloned();
    link_owner(
        person,
        owner,
        PersonRelation {
            roles,
            institutions,
            contact_reference: contact,
        },
    )
}
