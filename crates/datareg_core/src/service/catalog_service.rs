//! Catalog use-case service.
//!
//! # Responsibility
//! - Provide typed create/update/get/list/delete entry points for every
//!   catalog record type.
//! - Attach display names (stored or derived) to read results.
//! - Walk supersession chains in both directions.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Names are derived on every read, never cached.
//! - Lists are sorted by `name ASC, last_updated DESC, id ASC`.

use crate::model::user::Principal;
use crate::model::version::VersionedObject;
use crate::model::{Entity, EntityId, Stored};
use crate::repo::entity_repo::EntityRepository;
use crate::repo::filter::FilterSet;
use crate::repo::{listing_order, RepoError, RepoResult};
use serde::Serialize;
use std::collections::HashSet;

/// Persisted record together with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Named<T> {
    pub name: String,
    #[serde(flatten)]
    pub stored: Stored<T>,
}

impl<T> Named<T> {
    pub fn id(&self) -> EntityId {
        self.stored.id
    }

    pub fn record(&self) -> &T {
        &self.stored.record
    }
}

/// Use-case service wrapper for catalog records.
pub struct CatalogService<R: EntityRepository> {
    repo: R,
}

impl<R: EntityRepository> CatalogService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Creates a record attributed to `actor`.
    pub fn create<T: Entity>(&self, record: &T, actor: &Principal) -> RepoResult<EntityId> {
        self.repo.insert(record, actor)
    }

    /// Replaces all declared fields of an existing record.
    pub fn update<T: Entity>(&self, id: EntityId, record: &T, actor: &Principal) -> RepoResult<()> {
        self.repo.update(id, record, actor)
    }

    /// Loads one record; unknown ids are `NotFound`.
    pub fn get<T: Entity>(&self, id: EntityId) -> RepoResult<Named<T>> {
        self.find(id)?
            .ok_or(RepoError::NotFound { kind: T::KIND, id })
    }

    pub fn find<T: Entity>(&self, id: EntityId) -> RepoResult<Option<Named<T>>> {
        match self.repo.get::<T>(id)? {
            Some(stored) => Ok(Some(self.named(stored)?)),
            None => Ok(None),
        }
    }

    /// Lists matching records in default listing order.
    pub fn list<T: Entity>(&self, filters: &FilterSet) -> RepoResult<Vec<Named<T>>> {
        let mut records = self
            .repo
            .list::<T>(filters)?
            .into_iter()
            .map(|stored| self.named(stored))
            .collect::<RepoResult<Vec<_>>>()?;
        records.sort_by(|left, right| {
            listing_order(
                (left.name.as_str(), left.stored.last_updated, left.stored.id),
                (right.name.as_str(), right.stored.last_updated, right.stored.id),
            )
        });
        Ok(records)
    }

    /// Current display name of one record.
    pub fn name_of<T: Entity>(&self, id: EntityId) -> RepoResult<String> {
        self.repo.resolve_name(T::KIND, id)
    }

    /// Parent object of a version.
    pub fn parent_of<V: VersionedObject>(&self, id: EntityId) -> RepoResult<Named<V::Parent>> {
        let version = self.get::<V>(id)?;
        let parent_id = version.record().parent();
        self.find::<V::Parent>(parent_id)?.ok_or(RepoError::Reference {
            field: V::PARENT_FIELD,
            kind: <V::Parent as Entity>::KIND,
            id: parent_id,
        })
    }

    /// Deletes a record; dependents and issues cascade.
    pub fn delete<T: Entity>(&self, id: EntityId) -> RepoResult<()> {
        self.repo.delete(T::KIND, id)
    }

    /// Records that name `id` as their predecessor. Several successors
    /// (branching) are valid.
    pub fn superseded_by<T: Entity>(&self, id: EntityId) -> RepoResult<Vec<EntityId>> {
        if !self.repo.exists(T::KIND, id)? {
            return Err(RepoError::NotFound { kind: T::KIND, id });
        }
        self.repo.superseded_by(T::KIND, id)
    }

    /// Predecessors of `id`, nearest first.
    pub fn supersession_history<T: Entity>(&self, id: EntityId) -> RepoResult<Vec<EntityId>> {
        let mut history = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.get::<T>(id)?.record().supersedes();

        while let Some(predecessor) = current {
            if !seen.insert(predecessor) {
                return Err(RepoError::InvalidData(format!(
                    "supersession chain of {} {id} loops at {predecessor}",
                    T::KIND
                )));
            }
            history.push(predecessor);
            current = match self.repo.get::<T>(predecessor)? {
                Some(stored) => stored.record.supersedes(),
                None => None,
            };
        }

        Ok(history)
    }

    fn named<T: Entity>(&self, stored: Stored<T>) -> RepoResult<Named<T>> {
        let name = stored.record.name(&self.repo)?;
        Ok(Named { name, stored })
    }
}
