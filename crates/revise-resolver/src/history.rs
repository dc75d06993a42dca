use serde::{Deserialize, Serialize};
use tracing::debug;

use revise_store::{RevisionStore, StoreError, StoreResult};
use revise_types::{DatasetId, Entity, EntityId, VersionToken};

/// Why a declared base revision could not be retrieved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoneReason {
    /// The store retains no revision of this entity at the token. Either
    /// compaction removed it, or the token was issued to another entity
    /// (tokens may be store-wide); the store answers both the same way.
    Compacted,
    /// The token is ahead of the entity's current revision, so the store
    /// never issued it for this entity.
    NeverIssued,
}

/// Outcome of looking up a historical revision.
#[derive(Clone, Debug, PartialEq)]
pub enum BaseRevision {
    /// The snapshot as it existed at the requested token.
    Found(Entity),
    /// No snapshot is available at the requested token.
    Gone(GoneReason),
}

/// Translates a version token into the entity snapshot at that point in
/// history.
///
/// A missing revision is an ordinary outcome ([`BaseRevision::Gone`]), not
/// an error. Store failures propagate as [`StoreError`] so that an outage
/// is never mistaken for compaction.
pub struct HistoricalRevisionResolver<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: RevisionStore + ?Sized> HistoricalRevisionResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Fetch the snapshot of `id` at `version`.
    pub fn resolve(
        &self,
        dataset: &DatasetId,
        id: &EntityId,
        version: VersionToken,
    ) -> StoreResult<BaseRevision> {
        match self.store.get_at_version(dataset, id, version)? {
            Some(snapshot) => {
                if snapshot.id() != Some(id.as_str()) {
                    return Err(StoreError::Inconsistent(format!(
                        "revision {version} requested for {id} belongs to {:?}",
                        snapshot.id()
                    )));
                }
                debug!(dataset = %dataset, id = %id, %version, "base revision found");
                Ok(BaseRevision::Found(snapshot))
            }
            None => {
                debug!(dataset = %dataset, id = %id, %version, "base revision not retained");
                Ok(BaseRevision::Gone(GoneReason::Compacted))
            }
        }
    }

    /// Like [`resolve`](Self::resolve), but reports tokens newer than
    /// `latest` as [`GoneReason::NeverIssued`] without contacting the store.
    pub fn resolve_bounded(
        &self,
        dataset: &DatasetId,
        id: &EntityId,
        version: VersionToken,
        latest: VersionToken,
    ) -> StoreResult<BaseRevision> {
        if version > latest {
            debug!(dataset = %dataset, id = %id, %version, %latest, "declared base is ahead of current revision");
            return Ok(BaseRevision::Gone(GoneReason::NeverIssued));
        }
        self.resolve(dataset, id, version)
    }
}
