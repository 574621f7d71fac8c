//! Whitelist edits. Each returns whether the whitelist changed, so callers
//! only persist and announce real changes.

use crate::model::{Group, ObjectId, StrippedUser, Whitelist};

pub fn enable(whitelist: &mut Whitelist) -> bool {
    !std::mem::replace(&mut whitelist.enabled, true)
}

pub fn disable(whitelist: &mut Whitelist) -> bool {
    std::mem::replace(&mut whitelist.enabled, false)
}

pub fn add_person(whitelist: &mut Whitelist, person: StrippedUser) -> bool {
    if whitelist.persons.iter().any(|p| p.id == person.id) {
        return false;
    }
    whitelist.persons.push(person);
    true
}

pub fn remove_person(whitelist: &mut Whitelist, id: &ObjectId) -> bool {
    let before = whitelist.persons.len();
    whitelist.persons.retain(|p| &p.id != id);
    whitelist.persons.len() != before
}

/// Add a group, or refresh the embedded copy of one already listed.
pub fn add_group(whitelist: &mut Whitelist, group: Group) -> bool {
    match whitelist.groups.iter_mut().find(|g| g.id == group.id) {
        Some(existing) if *existing == group => false,
        Some(existing) => {
            *existing = group;
            true
        }
        None => {
            whitelist.groups.push(group);
            true
        }
    }
}

pub fn remove_group(whitelist: &mut Whitelist, id: &ObjectId) -> bool {
    let before = whitelist.groups.len();
    whitelist.groups.retain(|g| &g.id != id);
    whitelist.groups.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let mut whitelist = Whitelist::default();
        assert!(enable(&mut whitelist));
        assert!(!enable(&mut whitelist));
        assert!(disable(&mut whitelist));
        assert!(!disable(&mut whitelist));
    }

    #[test]
    fn test_persons() {
        let mut whitelist = Whitelist::default();
        assert!(add_person(&mut whitelist, StrippedUser::new("u2", "bob")));
        assert!(!add_person(&mut whitelist, StrippedUser::new("u2", "bob")));
        assert_eq!(whitelist.persons.len(), 1);
        assert!(remove_person(&mut whitelist, &ObjectId::new("u2")));
        assert!(!remove_person(&mut whitelist, &ObjectId::new("u2")));
    }

    #[test]
    fn test_groups() {
        let mut whitelist = Whitelist::default();
        let mut group = Group::new("g1", "Curators", StrippedUser::new("u4", "dana"));
        assert!(add_group(&mut whitelist, group.clone()));
        assert!(!add_group(&mut whitelist, group.clone()));

        group.members.push(StrippedUser::new("u5", "erin"));
        assert!(add_group(&mut whitelist, group));
        assert_eq!(whitelist.groups.len(), 1);
        assert!(whitelist.groups[0].contains(&ObjectId::new("u5")));

        assert!(remove_group(&mut whitelist, &ObjectId::new("g1")));
        assert!(whitelist.groups.is_empty());
    }
}
