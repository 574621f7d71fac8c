//! Visibility verdicts.

use super::{Guarded, Principal, Verdict};

/// Decide whether `principal` may see `object`.
///
/// Pure: reads the object and never changes it.
pub fn can_view<G: Guarded + ?Sized>(
    principal: &Principal,
    object: &G,
    supplied_password: Option<&str>,
) -> Verdict {
    if let Some(user) = principal.id() {
        if object.is_owned_by(user) {
            return Verdict::Allow;
        }
    }

    let whitelist = object.whitelist();
    if !whitelist.enabled {
        return match object.password() {
            None => Verdict::Allow,
            Some(expected) if supplied_password == Some(expected) => Verdict::Allow,
            Some(_) => Verdict::DenyPassword,
        };
    }

    let Some(user) = principal.id() else {
        return Verdict::DenyWhitelist;
    };
    let listed = whitelist.persons.iter().any(|p| &p.id == user)
        || whitelist.groups.iter().any(|g| g.contains(user));
    if listed {
        Verdict::Allow
    } else {
        Verdict::DenyWhitelist
    }
}
