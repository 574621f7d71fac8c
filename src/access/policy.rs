//! What a caller is told when an object is hidden.
//!
//! Privileged callers learn why they were denied and whether an object
//! exists. Everyone else gets the same `Forbidden` for hidden and missing
//! objects alike.

use tracing::debug;

use super::{can_view, Guarded, Principal, Verdict};
use crate::config::AccessConfig;
use crate::error::{AccessError, RepoError, Result, StorageError};
use crate::model::ObjectId;
use crate::resolver::{Resolution, Resolver};
use crate::storage::{load, Collection};

/// Maps verdicts to caller-facing errors.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    privileged_roles: Vec<String>,
}

impl AccessPolicy {
    pub fn new(config: &AccessConfig) -> Self {
        Self {
            privileged_roles: config
                .privileged_roles
                .iter()
                .map(|r| r.to_lowercase())
                .collect(),
        }
    }

    pub fn is_privileged(&self, principal: &Principal) -> bool {
        principal
            .role()
            .is_some_and(|role| self.privileged_roles.iter().any(|r| r == role.as_str()))
    }

    /// Turn a verdict into `Ok` or the error this caller may see.
    pub fn enforce(
        &self,
        principal: &Principal,
        verdict: Verdict,
    ) -> std::result::Result<(), AccessError> {
        match verdict.deny_reason() {
            None => Ok(()),
            Some(reason) if self.is_privileged(principal) => Err(AccessError::Denied(reason)),
            Some(_) => Err(AccessError::Forbidden),
        }
    }

    /// Evaluate and enforce visibility of `object`.
    pub fn check<G: Guarded>(
        &self,
        principal: &Principal,
        object: &G,
        supplied_password: Option<&str>,
    ) -> std::result::Result<(), AccessError> {
        let verdict = can_view(principal, object, supplied_password);
        debug!(
            "Access to {}/{} for {}: {}",
            G::COLLECTION,
            object.id(),
            principal,
            verdict
        );
        self.enforce(principal, verdict)
    }

    /// The error reported for an object that does not exist.
    pub fn not_found(
        &self,
        principal: &Principal,
        collection: Collection,
        id: &ObjectId,
    ) -> RepoError {
        if self.is_privileged(principal) {
            StorageError::NotFound {
                collection,
                id: id.clone(),
            }
            .into()
        } else {
            AccessError::Forbidden.into()
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(&AccessConfig::default())
    }
}

/// Loads guarded objects and resolves them only for callers allowed to see
/// them.
#[derive(Clone)]
pub struct AccessGuard {
    resolver: Resolver,
    policy: AccessPolicy,
}

impl AccessGuard {
    pub fn new(resolver: Resolver, policy: AccessPolicy) -> Self {
        Self { resolver, policy }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Load, check and resolve an entity or compilation.
    pub async fn view<G: Guarded>(
        &self,
        principal: &Principal,
        id: &ObjectId,
        supplied_password: Option<&str>,
    ) -> Result<Resolution<G>> {
        let Some(current) = load::<G>(self.resolver.store().as_ref(), id).await? else {
            return Err(self.policy.not_found(principal, G::COLLECTION, id));
        };
        self.policy
            .check(principal, &current.document, supplied_password)?;
        self.resolver.resolve(current.document).await
    }
}
