//! Ranked annotation lists.

use tracing::debug;

use super::AnnotationDelta;
use crate::error::AnnotationError;
use crate::model::{Annotation, ObjectId, Reference, TargetOwner};

/// The annotations of one entity or compilation, kept in display order.
///
/// Display order is `ranking` ascending, ties broken by creation time.
/// Ranks need not be contiguous.
#[derive(Debug, Clone)]
pub struct AnnotationList {
    owner: TargetOwner,
    entries: Vec<Annotation>,
}

impl AnnotationList {
    pub fn new(owner: TargetOwner) -> Self {
        Self {
            owner,
            entries: Vec::new(),
        }
    }

    /// Build a list from a stored `annotationList`.
    ///
    /// Only resolved entries can be ranked; `null` slots and stubs are
    /// skipped.
    pub fn from_references(
        owner: TargetOwner,
        references: impl IntoIterator<Item = Option<Reference<Annotation>>>,
    ) -> Self {
        let mut skipped = 0;
        let mut entries = Vec::new();
        for reference in references {
            match reference.and_then(Reference::into_resolved) {
                Some(annotation) => entries.push(annotation),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!("Skipped {} unresolved annotations of {}", skipped, owner.id());
        }
        let mut list = Self { owner, entries };
        list.sort();
        list
    }

    /// The stored form, in display order.
    pub fn into_references(self) -> Vec<Option<Reference<Annotation>>> {
        self.entries
            .into_iter()
            .map(|a| Some(Reference::Resolved(a)))
            .collect()
    }

    pub fn owner(&self) -> &TargetOwner {
        &self.owner
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.entries.iter()
    }

    pub fn get(&self, id: &ObjectId) -> Option<&Annotation> {
        self.entries.iter().find(|a| &a.id == id)
    }

    /// Ids in display order.
    pub fn ids(&self) -> Vec<ObjectId> {
        self.entries.iter().map(|a| a.id.clone()).collect()
    }

    /// `(id, ranking)` pairs in display order.
    pub fn rankings(&self) -> Vec<(ObjectId, i64)> {
        self.entries
            .iter()
            .map(|a| (a.id.clone(), a.ranking))
            .collect()
    }

    /// Add an annotation targeting this list's owner.
    pub fn attach(&mut self, annotation: Annotation) -> Result<AnnotationDelta, AnnotationError> {
        let target = annotation.target_owner()?;
        if target != self.owner {
            return Err(AnnotationError::InvalidTarget(format!(
                "annotation {} targets {} {}, not {}",
                annotation.id,
                target.collection(),
                target.id(),
                self.owner.id()
            )));
        }
        if self.get(&annotation.id).is_some() {
            return Err(AnnotationError::Duplicate(annotation.id));
        }

        let delta = AnnotationDelta::Attach {
            annotation: Box::new(annotation.clone()),
        };
        self.entries.push(annotation);
        self.sort();
        Ok(delta)
    }

    /// Remove an annotation. Other ranks are left as they are.
    pub fn detach(&mut self, id: &ObjectId) -> Result<AnnotationDelta, AnnotationError> {
        let position = self.position(id)?;
        self.entries.remove(position);
        Ok(AnnotationDelta::Detach { id: id.clone() })
    }

    /// Move an annotation to `new_rank`, shifting everything ranked between
    /// its old and new rank by one towards the gap it left.
    pub fn reorder(
        &mut self,
        id: &ObjectId,
        new_rank: i64,
    ) -> Result<AnnotationDelta, AnnotationError> {
        let position = self.position(id)?;
        let old_rank = self.entries[position].ranking;

        for (i, entry) in self.entries.iter_mut().enumerate() {
            if i == position {
                entry.ranking = new_rank;
            } else if new_rank > old_rank && entry.ranking > old_rank && entry.ranking <= new_rank {
                entry.ranking -= 1;
            } else if new_rank < old_rank && entry.ranking >= new_rank && entry.ranking < old_rank
            {
                entry.ranking += 1;
            }
        }
        self.sort();

        Ok(AnnotationDelta::Reorder {
            id: id.clone(),
            from: old_rank,
            to: new_rank,
        })
    }

    /// Apply a delta received from a collaborator.
    pub fn apply_delta(&mut self, delta: &AnnotationDelta) -> Result<(), AnnotationError> {
        match delta {
            AnnotationDelta::Attach { annotation } => {
                self.attach(annotation.as_ref().clone()).map(drop)
            }
            AnnotationDelta::Detach { id } => self.detach(id).map(drop),
            AnnotationDelta::Reorder { id, from, to } => {
                if let Some(current) = self.get(id) {
                    if current.ranking != *from {
                        debug!(
                            "Reordering {} from rank {} although the delta expected {}",
                            id, current.ranking, from
                        );
                    }
                }
                self.reorder(id, *to).map(drop)
            }
        }
    }

    fn position(&self, id: &ObjectId) -> Result<usize, AnnotationError> {
        self.entries
            .iter()
            .position(|a| &a.id == id)
            .ok_or_else(|| AnnotationError::UnknownAnnotation(id.clone()))
    }

    fn sort(&mut self) {
        self.entries.sort_by(|a, b| {
            a.ranking
                .cmp(&b.ranking)
                .then_with(|| a.created_at().cmp(&b.created_at()))
                .then_with(|| a.created.cmp(&b.created))
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Agent;

    fn owner() -> TargetOwner {
        TargetOwner::Entity(ObjectId::new("e1"))
    }

    fn annotation(id: &str, ranking: i64) -> Annotation {
        Annotation::new(id, ranking, Agent::person("u1", "alice"), owner())
    }

    fn list(ranks: &[(&str, i64)]) -> AnnotationList {
        let mut list = AnnotationList::new(owner());
        for (id, rank) in ranks {
            list.attach(annotation(id, *rank)).unwrap();
        }
        list
    }

    fn ranks(list: &AnnotationList) -> Vec<(String, i64)> {
        list.rankings()
            .into_iter()
            .map(|(id, rank)| (id.to_string(), rank))
            .collect()
    }

    #[test]
    fn test_attach_sorts_by_ranking() {
        let list = list(&[("b", 5), ("a", 1), ("c", 9)]);
        let ids: Vec<_> = list.ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ties_broken_by_creation_time() {
        let mut older = annotation("z", 1);
        older.created = "2020-01-01T00:00:00Z".to_string();
        let mut newer = annotation("a", 1);
        newer.created = "2021-01-01T00:00:00Z".to_string();

        let mut list = AnnotationList::new(owner());
        list.attach(newer).unwrap();
        list.attach(older).unwrap();
        assert_eq!(list.ids()[0].as_str(), "z");
    }

    #[test]
    fn test_attach_rejects_duplicates_and_foreign_targets() {
        let mut list = list(&[("a", 0)]);
        assert_eq!(
            list.attach(annotation("a", 3)).unwrap_err(),
            AnnotationError::Duplicate(ObjectId::new("a"))
        );

        let foreign = Annotation::new(
            "x",
            0,
            Agent::person("u1", "alice"),
            TargetOwner::Compilation(ObjectId::new("c1")),
        );
        assert!(matches!(
            list.attach(foreign),
            Err(AnnotationError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_reorder_down_and_up() {
        let mut list = list(&[("a", 0), ("b", 1), ("c", 2), ("d", 3)]);

        list.reorder(&ObjectId::new("a"), 2).unwrap();
        assert_eq!(
            ranks(&list),
            vec![
                ("b".to_string(), 0),
                ("c".to_string(), 1),
                ("a".to_string(), 2),
                ("d".to_string(), 3)
            ]
        );

        list.reorder(&ObjectId::new("d"), 0).unwrap();
        assert_eq!(
            ranks(&list),
            vec![
                ("d".to_string(), 0),
                ("b".to_string(), 1),
                ("c".to_string(), 2),
                ("a".to_string(), 3)
            ]
        );
    }

    #[test]
    fn test_reorder_round_trip_with_gaps() {
        let mut list = list(&[("a", 0), ("b", 4), ("c", 5), ("d", 10)]);
        let before = ranks(&list);

        let delta = list.reorder(&ObjectId::new("b"), 10).unwrap();
        assert_ne!(ranks(&list), before);
        list.apply_delta(&delta.inverse().unwrap()).unwrap();
        assert_eq!(ranks(&list), before);
    }

    #[test]
    fn test_detach_keeps_ranks() {
        let mut list = list(&[("a", 0), ("b", 1), ("c", 2)]);
        list.detach(&ObjectId::new("b")).unwrap();
        assert_eq!(
            ranks(&list),
            vec![("a".to_string(), 0), ("c".to_string(), 2)]
        );
        assert_eq!(
            list.detach(&ObjectId::new("b")).unwrap_err(),
            AnnotationError::UnknownAnnotation(ObjectId::new("b"))
        );
    }

    #[test]
    fn test_apply_deltas_in_order() {
        let mut local = list(&[("a", 0), ("b", 1)]);
        let mut remote = local.clone();

        let deltas = vec![
            local.attach(annotation("c", 2)).unwrap(),
            local.reorder(&ObjectId::new("c"), 0).unwrap(),
            local.detach(&ObjectId::new("a")).unwrap(),
        ];
        for delta in &deltas {
            remote.apply_delta(delta).unwrap();
        }
        assert_eq!(ranks(&remote), ranks(&local));
    }

    #[test]
    fn test_references_round_trip() {
        let references = vec![
            Some(Reference::Resolved(annotation("b", 2))),
            None,
            Some(Reference::stub("gone")),
            Some(Reference::Resolved(annotation("a", 1))),
        ];
        let list = AnnotationList::from_references(owner(), references);
        assert_eq!(list.len(), 2);

        let stored = list.into_references();
        assert_eq!(stored[0].as_ref().unwrap().id().as_str(), "a");
    }
}
