use std::sync::Arc;

use revise_types::{DatasetId, Entity, EntityId, VersionToken};

use crate::error::{StoreError, StoreResult};

/// Client for an external versioned entity store.
///
/// All implementations must satisfy these invariants:
/// - Every successful write receives a fresh version token, strictly
///   greater than any token previously issued for that entity.
/// - A token addresses exactly one immutable snapshot until compaction
///   removes it.
/// - Calls may block; timeouts are the implementation's concern and an
///   exhausted timeout surfaces as [`StoreError::Unavailable`].
/// - Concurrent use from multiple requests is safe.
pub trait RevisionStore: Send + Sync {
    /// Fetch the current revision of an entity.
    ///
    /// Returns `Ok(None)` if the entity has never been written.
    fn get_current(&self, dataset: &DatasetId, id: &EntityId) -> StoreResult<Option<Entity>>;

    /// Fetch the revision of an entity as of `version`.
    ///
    /// Returns `Ok(None)` if the store has no revision at that token, for
    /// example because compaction removed it.
    fn get_at_version(
        &self,
        dataset: &DatasetId,
        id: &EntityId,
        version: VersionToken,
    ) -> StoreResult<Option<Entity>>;

    /// Write a new revision and return it as stored, stamped with the
    /// version token the store assigned.
    fn persist(&self, dataset: &DatasetId, entity: &Entity) -> StoreResult<Entity>;

    /// Write a new revision only if the entity's current version is still
    /// `expected` (`None` meaning the entity must not exist yet).
    ///
    /// Default implementation reports the operation as unsupported.
    /// Backends with a compare-and-set primitive should override it.
    fn persist_conditional(
        &self,
        dataset: &DatasetId,
        entity: &Entity,
        expected: Option<VersionToken>,
    ) -> StoreResult<Entity> {
        let _ = (dataset, entity, expected);
        Err(StoreError::Unsupported("conditional write"))
    }
}

impl<S: RevisionStore + ?Sized> RevisionStore for Arc<S> {
    fn get_current(&self, dataset: &DatasetId, id: &EntityId) -> StoreResult<Option<Entity>> {
        (**self).get_current(dataset, id)
    }

    fn get_at_version(
        &self,
        dataset: &DatasetId,
        id: &EntityId,
        version: VersionToken,
    ) -> StoreResult<Option<Entity>> {
        (**self).get_at_version(dataset, id, version)
    }

    fn persist(&self, dataset: &DatasetId, entity: &Entity) -> StoreResult<Entity> {
        (**self).persist(dataset, entity)
    }

    fn persist_conditional(
        &self,
        dataset: &DatasetId,
        entity: &Entity,
        expected: Option<VersionToken>,
    ) -> StoreResult<Entity> {
        (**self).persist_conditional(dataset, entity, expected)
    }
}
