//! The update resolution engine.
//!
//! [`UpdateResolver`] classifies every incoming write into exactly one of
//! CREATE, DIRECT_APPLY, MERGED, or a [`ConflictResult`], and optionally
//! persists the accepted entity. It holds no state between requests; the
//! store is the only shared resource.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use revise_merge::{diff_entities, merge_entities};
use revise_store::{RetryingStore, RevisionStore, StoreError};
use revise_types::{DatasetId, Entity, EntityId, VersionToken};

use crate::config::ResolverConfig;
use crate::conflict::ConflictResult;
use crate::error::{ResolveError, ResolveResult};
use crate::history::{BaseRevision, HistoricalRevisionResolver};

/// How an accepted write was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    /// No entity existed; the write creates it.
    Create,
    /// The write was based on the current revision.
    DirectApply,
    /// The write was based on an older revision and merged cleanly.
    Merged,
}

/// An accepted write, ready to persist.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub kind: ResolutionKind,
    /// The entity to hand to the store.
    pub entity: Entity,
    /// Version of the stored entity observed while resolving (`None` on
    /// create). Conditional writes are keyed on it.
    pub observed_version: Option<VersionToken>,
}

/// A resolved write after the store accepted it.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedWrite {
    pub kind: ResolutionKind,
    /// The entity as persisted, carrying its newly assigned version token.
    pub entity: Entity,
}

/// Optimistic-concurrency resolver for writes against a [`RevisionStore`].
pub struct UpdateResolver<S> {
    store: S,
    config: ResolverConfig,
}

impl<S: RevisionStore> UpdateResolver<RetryingStore<S>> {
    /// Build a resolver whose store calls are retried per `config.retry`.
    pub fn with_retry(store: S, config: ResolverConfig) -> Self {
        let policy = config.retry.clone();
        Self::new(RetryingStore::new(store, policy), config)
    }
}

impl<S: RevisionStore> UpdateResolver<S> {
    pub fn new(store: S, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Decide how `proposed` should be written to `id`, without writing it.
    ///
    /// The proposed entity's `_id` is set to `id` first. Performs one read of
    /// the current revision and at most one historical read.
    pub fn resolve_write(
        &self,
        dataset: &DatasetId,
        id: &EntityId,
        mut proposed: Entity,
    ) -> ResolveResult<Resolution> {
        proposed.set_id(id);

        let Some(current) = self.store.get_current(dataset, id)? else {
            debug!(dataset = %dataset, id = %id, "no stored entity; creating");
            return Ok(Resolution {
                kind: ResolutionKind::Create,
                entity: proposed,
                observed_version: None,
            });
        };

        let current_version = current.version()?.ok_or_else(|| {
            StoreError::Inconsistent(format!("stored entity {id} has no version token"))
        })?;

        let Some(declared) = proposed.version()? else {
            warn!(dataset = %dataset, id = %id, current = %current_version, "write declares no base version");
            return Err(ConflictResult::MissingVersion {
                ours: current,
                yours: proposed,
            }
            .into());
        };

        if declared == current_version {
            debug!(dataset = %dataset, id = %id, version = %declared, "write is based on current revision");
            return Ok(Resolution {
                kind: ResolutionKind::DirectApply,
                entity: proposed,
                observed_version: Some(current_version),
            });
        }

        debug!(
            dataset = %dataset,
            id = %id,
            declared = %declared,
            current = %current_version,
            "concurrent write detected; looking up base revision"
        );
        let history = HistoricalRevisionResolver::new(&self.store);
        let base = match history.resolve_bounded(dataset, id, declared, current_version)? {
            BaseRevision::Found(base) => base,
            BaseRevision::Gone(reason) => {
                warn!(dataset = %dataset, id = %id, declared = %declared, ?reason, "base revision unavailable");
                return Err(ConflictResult::BaseRevisionGone {
                    reason,
                    declared,
                    ours: current,
                    yours: proposed,
                }
                .into());
            }
        };

        match merge_entities(&proposed, &base, &current) {
            Ok(merged) => {
                debug!(
                    dataset = %dataset,
                    id = %id,
                    changed_fields = diff_entities(&current, &merged).len(),
                    "merged concurrent edits"
                );
                Ok(Resolution {
                    kind: ResolutionKind::Merged,
                    entity: merged,
                    observed_version: Some(current_version),
                })
            }
            Err(report) => {
                warn!(dataset = %dataset, id = %id, conflicts = report.len(), "automatic merge failed");
                Err(ConflictResult::MergeConflict {
                    report,
                    ours: current,
                    base,
                    yours: proposed,
                }
                .into())
            }
        }
    }

    /// Resolve `proposed` and persist the result.
    ///
    /// The resolution and the write are separate store calls. Unless
    /// `conditional_writes` is enabled, a revision persisted by another
    /// writer in between is superseded without a conflict being reported.
    pub fn apply_write(
        &self,
        dataset: &DatasetId,
        id: &EntityId,
        proposed: Entity,
    ) -> ResolveResult<AppliedWrite> {
        let resolution = self.resolve_write(dataset, id, proposed)?;
        let entity = self.persist(dataset, &resolution.entity, resolution.observed_version)?;
        info!(
            dataset = %dataset,
            id = %id,
            kind = ?resolution.kind,
            version = ?entity.version().ok().flatten(),
            "write persisted"
        );
        Ok(AppliedWrite {
            kind: resolution.kind,
            entity,
        })
    }

    // -----------------------------------------------------------------------
    // Read / delete
    // -----------------------------------------------------------------------

    /// The current revision of an entity.
    pub fn get_entity(&self, dataset: &DatasetId, id: &EntityId) -> ResolveResult<Option<Entity>> {
        Ok(self.store.get_current(dataset, id)?)
    }

    /// Mark an entity as deleted by persisting it with `_deleted: true`.
    ///
    /// Returns the persisted revision, or `None` if the entity does not exist.
    pub fn delete_entity(
        &self,
        dataset: &DatasetId,
        id: &EntityId,
    ) -> ResolveResult<Option<Entity>> {
        let Some(mut entity) = self.store.get_current(dataset, id)? else {
            debug!(dataset = %dataset, id = %id, "delete of missing entity ignored");
            return Ok(None);
        };
        let observed = entity.version()?;
        entity.mark_deleted();
        let stored = self.persist(dataset, &entity, observed)?;
        info!(dataset = %dataset, id = %id, "entity marked deleted");
        Ok(Some(stored))
    }

    fn persist(
        &self,
        dataset: &DatasetId,
        entity: &Entity,
        observed: Option<VersionToken>,
    ) -> ResolveResult<Entity> {
        if !self.config.conditional_writes {
            return Ok(self.store.persist(dataset, entity)?);
        }
        self.store
            .persist_conditional(dataset, entity, observed)
            .map_err(|e| match e {
                StoreError::VersionMismatch { expected, actual } => {
                    warn!(dataset = %dataset, ?expected, ?actual, "conditional write lost race");
                    ResolveError::ConcurrentWrite { expected, actual }
                }
                other => other.into(),
            })
    }
}
