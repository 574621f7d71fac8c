//! Compilation composition.
//!
//! A compilation view lists every slot of the compilation's `entities`
//! array in its original position. Entities the caller may see are
//! resolved; hidden and missing ones are replaced by id-only stubs so that
//! positions stay stable.

mod view;

use futures::future;
use tracing::{debug, info};

use crate::access::{can_view, AccessPolicy, Principal, Verdict};
use crate::error::{AccessError, RepoError, Result};
use crate::model::{Compilation, Entity, ObjectId};
use crate::resolver::{ResolveReport, Resolver};
use crate::storage::{load, Collection};

pub use view::{CompilationView, ComposedEntry};

/// Outcome of composing a compilation for one caller.
#[derive(Debug, Clone)]
pub enum CompositionResult {
    /// The compilation itself is hidden. No entity was looked at.
    Forbidden(Verdict),
    View(CompilationView),
}

impl CompositionResult {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, CompositionResult::Forbidden(_))
    }

    /// The view, or the error `policy` reports to this caller.
    pub fn into_view(
        self,
        policy: &AccessPolicy,
        principal: &Principal,
    ) -> Result<CompilationView> {
        match self {
            CompositionResult::View(view) => Ok(view),
            CompositionResult::Forbidden(verdict) => Err(policy
                .enforce(principal, verdict)
                .err()
                .unwrap_or(AccessError::Forbidden)
                .into()),
        }
    }
}

/// Builds access-filtered compilation views.
#[derive(Clone)]
pub struct Composer {
    resolver: Resolver,
    policy: AccessPolicy,
}

impl Composer {
    pub fn new(resolver: Resolver, policy: AccessPolicy) -> Self {
        Self { resolver, policy }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Compose the view of a stored compilation.
    pub async fn compose_by_id(
        &self,
        id: &ObjectId,
        principal: &Principal,
        supplied_password: Option<&str>,
    ) -> Result<CompositionResult> {
        let Some(current) = load::<Compilation>(self.resolver.store().as_ref(), id).await? else {
            return Err(self.policy.not_found(principal, Collection::Compilation, id));
        };
        self.compose(current.document, principal, supplied_password)
            .await
    }

    /// Compose the view of `compilation` for `principal`.
    ///
    /// Each entity is checked against its own stored whitelist and
    /// password, independently of the compilation's.
    pub async fn compose(
        &self,
        mut compilation: Compilation,
        principal: &Principal,
        supplied_password: Option<&str>,
    ) -> Result<CompositionResult> {
        let verdict = can_view(principal, &compilation, supplied_password);
        if !verdict.is_allowed() {
            debug!(
                "Compilation {} hidden from {}: {}",
                compilation.id, principal, verdict
            );
            return Ok(CompositionResult::Forbidden(verdict));
        }

        // Embedded entities may be stale, so every slot is read from the store.
        let slots = std::mem::take(&mut compilation.entities);
        let ids: Vec<ObjectId> = slots
            .iter()
            .flatten()
            .map(|reference| reference.id().clone())
            .collect();
        let mut fetched = self
            .resolver
            .fetch_many::<Entity>(&ids)
            .await?
            .into_iter();

        let mut entries = Vec::with_capacity(slots.len());
        let mut visible = Vec::new();
        for slot in slots {
            let Some(reference) = slot else {
                entries.push(ComposedEntry::Missing { id: None });
                continue;
            };
            let Some(entity) = fetched.next().flatten() else {
                entries.push(ComposedEntry::Missing {
                    id: Some(reference.id().clone()),
                });
                continue;
            };

            match can_view(principal, &entity, None) {
                Verdict::Allow => {
                    visible.push((entries.len(), entity));
                    // Placeholder, replaced once the entity is resolved.
                    entries.push(ComposedEntry::Missing { id: None });
                }
                verdict => {
                    debug!("Entity {} hidden from {}: {}", entity.id, principal, verdict);
                    entries.push(ComposedEntry::Hidden {
                        id: entity.id,
                        verdict,
                    });
                }
            }
        }

        let resolved = future::try_join_all(
            visible
                .into_iter()
                .map(|(position, entity)| async move {
                    let resolution = self.resolver.resolve(entity).await?;
                    Ok::<_, RepoError>((position, resolution))
                }),
        )
        .await?;

        let mut report = ResolveReport::default();
        for (position, resolution) in resolved {
            report.absorb(&resolution.report);
            entries[position] = ComposedEntry::Visible(Box::new(resolution.document));
        }

        let view = CompilationView {
            compilation,
            entries,
            report,
        };
        info!(
            "Composed compilation {}: {} visible, {} hidden, {} missing",
            view.compilation.id,
            view.visible_count(),
            view.hidden_count(),
            view.missing_count()
        );
        Ok(CompositionResult::View(view))
    }
}
