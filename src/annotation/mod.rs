//! Annotation attachment.
//!
//! Annotations are kept in ranked lists on entities and compilations, point
//! back at their owner through `target.source`, and are shared live through
//! collaboration rooms.

mod delta;
mod list;
mod room;

use serde::Serialize;

use crate::error::Result;
use crate::model::{Annotation, Compilation, Entity, Reference, TargetOwner};
use crate::resolver::{ResolveOptions, Resolver};

pub use delta::AnnotationDelta;
pub use list::AnnotationList;
pub use room::{RoomChange, RoomRegistry, SocketUser};

/// The entity or compilation an annotation belongs to.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OwnerDocument {
    Entity(Box<Entity>),
    Compilation(Box<Compilation>),
}

impl OwnerDocument {
    pub fn annotation_list(&self) -> &[Option<Reference<Annotation>>] {
        match self {
            OwnerDocument::Entity(entity) => &entity.annotation_list,
            OwnerDocument::Compilation(compilation) => &compilation.annotation_list,
        }
    }
}

/// Fetch the document an annotation's target points back at.
///
/// Fails only for an invalid target or an unreachable store; a deleted
/// owner yields `None`.
pub async fn resolve_owner(
    resolver: &Resolver,
    annotation: &Annotation,
) -> Result<Option<OwnerDocument>> {
    let owner = annotation.target_owner()?;
    let shallow = resolver.with_options(ResolveOptions::shallow());
    Ok(match &owner {
        TargetOwner::Entity(id) => shallow
            .fetch::<Entity>(id)
            .await?
            .map(|r| OwnerDocument::Entity(Box::new(r.document))),
        TargetOwner::Compilation(id) => shallow
            .fetch::<Compilation>(id)
            .await?
            .map(|r| OwnerDocument::Compilation(Box::new(r.document))),
    })
}

/// Load the ranked annotation list of an entity or compilation.
pub async fn load_list(
    resolver: &Resolver,
    owner: &TargetOwner,
) -> Result<Option<AnnotationList>> {
    let shallow = resolver.with_options(ResolveOptions::shallow());
    let references = match owner {
        TargetOwner::Entity(id) => shallow
            .fetch::<Entity>(id)
            .await?
            .map(|r| r.document.annotation_list),
        TargetOwner::Compilation(id) => shallow
            .fetch::<Compilation>(id)
            .await?
            .map(|r| r.document.annotation_list),
    };
    Ok(references.map(|refs| AnnotationList::from_references(owner.clone(), refs)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::{AnnotationError, RepoError};
    use crate::model::{Agent, ObjectId, StrippedUser};
    use crate::storage::{save, MemoryStore};

    fn agent() -> Agent {
        Agent::person("u1", "alice")
    }

    #[tokio::test]
    async fn test_resolve_owner_and_list() {
        let store = Arc::new(MemoryStore::new());
        let owner = TargetOwner::Compilation(ObjectId::new("c1"));
        let first = Annotation::new("a1", 1, agent(), owner.clone());
        let second = Annotation::new("a2", 0, agent(), owner.clone());
        save(store.as_ref(), &first, None).await.unwrap();
        save(store.as_ref(), &second, None).await.unwrap();

        let mut compilation = Compilation::new("c1", "Vessels", StrippedUser::new("u1", "alice"));
        compilation.annotation_list = vec![
            Some(Reference::stub("a1")),
            None,
            Some(Reference::stub("a2")),
        ];
        save(store.as_ref(), &compilation, None).await.unwrap();

        let resolver = Resolver::new(store, ResolveOptions::deep());
        let found = resolve_owner(&resolver, &first).await.unwrap().unwrap();
        assert!(matches!(found, OwnerDocument::Compilation(_)));
        assert_eq!(found.annotation_list().len(), 3);

        let list = load_list(&resolver, &owner).await.unwrap().unwrap();
        let ids: Vec<_> = list.ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["a2", "a1"]);
    }

    #[tokio::test]
    async fn test_resolve_owner_rejects_bad_target() {
        let store = Arc::new(MemoryStore::new());
        let resolver = Resolver::new(store, ResolveOptions::shallow());

        let mut annotation = Annotation::new(
            "a1",
            0,
            agent(),
            TargetOwner::Entity(ObjectId::new("e1")),
        );
        assert!(resolve_owner(&resolver, &annotation)
            .await
            .unwrap()
            .is_none());

        annotation.target.source.related_compilation = Some(ObjectId::new("c1"));
        let err = resolve_owner(&resolver, &annotation).await.unwrap_err();
        assert!(matches!(
            err,
            RepoError::Annotation(AnnotationError::InvalidTarget(_))
        ));
    }
}
