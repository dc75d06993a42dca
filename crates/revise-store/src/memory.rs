use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use revise_types::{DatasetId, Entity, EntityId, VersionToken};

use crate::error::{StoreError, StoreResult};
use crate::traits::RevisionStore;

type HistoryKey = (DatasetId, EntityId);

#[derive(Default)]
struct Histories {
    /// Next token to issue. Tokens are store-wide, so they also order
    /// revisions across entities.
    next_version: u64,
    /// Revisions per entity, oldest first. Compaction removes from the front.
    revisions: HashMap<HistoryKey, Vec<Entity>>,
}

/// In-memory revision store that keeps every revision until compacted.
///
/// Intended for tests and embedding. Tokens start at 1 and are issued from a
/// single store-wide counter. Compaction and failure injection are exposed so
/// callers can exercise the paths a real store produces on its own schedule.
pub struct InMemoryRevisionStore {
    inner: RwLock<Histories>,
    pending_failures: AtomicU32,
}

impl InMemoryRevisionStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Histories {
                next_version: 1,
                revisions: HashMap::new(),
            }),
            pending_failures: AtomicU32::new(0),
        }
    }

    /// Load an existing history for one dataset, oldest revision first.
    ///
    /// Every revision must carry `_id` and `_updated`, and tokens must
    /// strictly increase per entity. Subsequent writes are issued tokens
    /// above the highest one seeded.
    pub fn seed(&self, dataset: &DatasetId, revisions: Vec<Entity>) -> StoreResult<()> {
        let mut inner = self.inner.write().expect("lock poisoned");
        for revision in revisions {
            let id = entity_id(&revision)?;
            let version = revision.version()?.ok_or_else(|| {
                StoreError::Inconsistent(format!("seeded revision of {id} has no _updated"))
            })?;
            let following = version.checked_next().ok_or_else(token_space_exhausted)?;
            let history = inner.revisions.entry((dataset.clone(), id.clone())).or_default();
            if let Some(last) = history.last().and_then(|e| e.version().ok().flatten()) {
                if version <= last {
                    return Err(StoreError::Inconsistent(format!(
                        "seeded revision {version} of {id} does not follow {last}"
                    )));
                }
            }
            history.push(revision);
            inner.next_version = inner.next_version.max(following.offset());
        }
        Ok(())
    }

    /// Drop all but the newest `keep_latest` revisions of an entity.
    ///
    /// Returns the number of revisions removed. The current revision is
    /// always kept, even when `keep_latest` is zero.
    pub fn compact(&self, dataset: &DatasetId, id: &EntityId, keep_latest: usize) -> usize {
        let mut inner = self.inner.write().expect("lock poisoned");
        let Some(history) = inner.revisions.get_mut(&(dataset.clone(), id.clone())) else {
            return 0;
        };
        let keep = keep_latest.max(1);
        let remove = history.len().saturating_sub(keep);
        history.drain(..remove);
        remove
    }

    /// Number of retained revisions of an entity.
    pub fn revision_count(&self, dataset: &DatasetId, id: &EntityId) -> usize {
        let inner = self.inner.read().expect("lock poisoned");
        inner
            .revisions
            .get(&(dataset.clone(), id.clone()))
            .map_or(0, Vec::len)
    }

    /// Number of distinct entities across all datasets.
    pub fn entity_count(&self) -> usize {
        self.inner.read().expect("lock poisoned").revisions.len()
    }

    /// Make the next `count` store calls fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self, count: u32) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    fn injected_failure(&self) -> StoreResult<()> {
        let took = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match took {
            Ok(_) => Err(StoreError::unavailable("injected failure")),
            Err(_) => Ok(()),
        }
    }

    fn append(inner: &mut Histories, dataset: &DatasetId, entity: &Entity) -> StoreResult<Entity> {
        let id = entity_id(entity)?;
        let token = VersionToken::new(inner.next_version);
        let following = token.checked_next().ok_or_else(token_space_exhausted)?;
        let mut stored = entity.clone();
        stored.set_version(token);
        inner.next_version = following.offset();
        inner
            .revisions
            .entry((dataset.clone(), id))
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }
}

impl Default for InMemoryRevisionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RevisionStore for InMemoryRevisionStore {
    fn get_current(&self, dataset: &DatasetId, id: &EntityId) -> StoreResult<Option<Entity>> {
        self.injected_failure()?;
        let inner = self.inner.read().expect("lock poisoned");
        Ok(inner
            .revisions
            .get(&(dataset.clone(), id.clone()))
            .and_then(|history| history.last().cloned()))
    }

    fn get_at_version(
        &self,
        dataset: &DatasetId,
        id: &EntityId,
        version: VersionToken,
    ) -> StoreResult<Option<Entity>> {
        self.injected_failure()?;
        let inner = self.inner.read().expect("lock poisoned");
        Ok(inner
            .revisions
            .get(&(dataset.clone(), id.clone()))
            .and_then(|history| {
                history
                    .iter()
                    .find(|e| matches!(e.version(), Ok(Some(v)) if v == version))
                    .cloned()
            }))
    }

    fn persist(&self, dataset: &DatasetId, entity: &Entity) -> StoreResult<Entity> {
        self.injected_failure()?;
        let mut inner = self.inner.write().expect("lock poisoned");
        Self::append(&mut inner, dataset, entity)
    }

    fn persist_conditional(
        &self,
        dataset: &DatasetId,
        entity: &Entity,
        expected: Option<VersionToken>,
    ) -> StoreResult<Entity> {
        self.injected_failure()?;
        let id = entity_id(entity)?;
        let mut inner = self.inner.write().expect("lock poisoned");
        let actual = match inner
            .revisions
            .get(&(dataset.clone(), id))
            .and_then(|history| history.last())
        {
            Some(current) => current.version()?,
            None => None,
        };
        if actual != expected {
            return Err(StoreError::VersionMismatch { expected, actual });
        }
        Self::append(&mut inner, dataset, entity)
    }
}

impl std::fmt::Debug for InMemoryRevisionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entity_count();
        f.debug_struct("InMemoryRevisionStore")
            .field("entity_count", &count)
            .finish()
    }
}

fn token_space_exhausted() -> StoreError {
    StoreError::Inconsistent("version token space exhausted".into())
}

fn entity_id(entity: &Entity) -> StoreResult<EntityId> {
    let raw = entity.id().ok_or(StoreError::MissingIdentity)?;
    Ok(EntityId::new(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset() -> DatasetId {
        DatasetId::new("people").unwrap()
    }

    fn bob_id() -> EntityId {
        EntityId::new("bob").unwrap()
    }

    fn bob(age: u64) -> Entity {
        Entity::from_json(json!({"_id": "bob", "name": "Bob", "age": age})).unwrap()
    }

    // -----------------------------------------------------------------------
    // Current and historical reads
    // -----------------------------------------------------------------------

    #[test]
    fn missing_entity_reads_as_none() {
        let store = InMemoryRevisionStore::new();
        assert!(store.get_current(&dataset(), &bob_id()).unwrap().is_none());
        assert!(store
            .get_at_version(&dataset(), &bob_id(), VersionToken::new(1))
            .unwrap()
            .is_none());
    }

    #[test]
    fn persist_assigns_increasing_tokens() {
        let store = InMemoryRevisionStore::new();
        let first = store.persist(&dataset(), &bob(30)).unwrap();
        let second = store.persist(&dataset(), &bob(31)).unwrap();
        assert_eq!(first.version().unwrap(), Some(VersionToken::new(1)));
        assert_eq!(second.version().unwrap(), Some(VersionToken::new(2)));

        let current = store.get_current(&dataset(), &bob_id()).unwrap().unwrap();
        assert_eq!(current, second);
    }

    #[test]
    fn persist_ignores_caller_supplied_token() {
        let store = InMemoryRevisionStore::new();
        let mut entity = bob(30);
        entity.set_version(VersionToken::new(999));
        let stored = store.persist(&dataset(), &entity).unwrap();
        assert_eq!(stored.version().unwrap(), Some(VersionToken::new(1)));
    }

    #[test]
    fn historical_reads_return_exact_snapshot() {
        let store = InMemoryRevisionStore::new();
        store.persist(&dataset(), &bob(30)).unwrap();
        store.persist(&dataset(), &bob(31)).unwrap();

        let old = store
            .get_at_version(&dataset(), &bob_id(), VersionToken::new(1))
            .unwrap()
            .unwrap();
        assert_eq!(old.get("age"), Some(&json!(30)));
    }

    #[test]
    fn tokens_are_store_wide() {
        let store = InMemoryRevisionStore::new();
        store.persist(&dataset(), &bob(30)).unwrap();
        let alice = Entity::from_json(json!({"_id": "alice"})).unwrap();
        let stored = store.persist(&dataset(), &alice).unwrap();
        assert_eq!(stored.version().unwrap(), Some(VersionToken::new(2)));
        // Token 2 belongs to alice, not bob.
        assert!(store
            .get_at_version(&dataset(), &bob_id(), VersionToken::new(2))
            .unwrap()
            .is_none());
    }

    #[test]
    fn datasets_are_isolated() {
        let store = InMemoryRevisionStore::new();
        store.persist(&dataset(), &bob(30)).unwrap();
        let other = DatasetId::new("archive").unwrap();
        assert!(store.get_current(&other, &bob_id()).unwrap().is_none());
    }

    #[test]
    fn persist_requires_identity() {
        let store = InMemoryRevisionStore::new();
        let anonymous = Entity::from_json(json!({"name": "nobody"})).unwrap();
        assert_eq!(
            store.persist(&dataset(), &anonymous),
            Err(StoreError::MissingIdentity)
        );
    }

    // -----------------------------------------------------------------------
    // Compaction
    // -----------------------------------------------------------------------

    #[test]
    fn compaction_removes_old_revisions() {
        let store = InMemoryRevisionStore::new();
        for age in 30..35 {
            store.persist(&dataset(), &bob(age)).unwrap();
        }
        assert_eq!(store.compact(&dataset(), &bob_id(), 2), 3);
        assert_eq!(store.revision_count(&dataset(), &bob_id()), 2);
        assert!(store
            .get_at_version(&dataset(), &bob_id(), VersionToken::new(1))
            .unwrap()
            .is_none());
        assert!(store
            .get_at_version(&dataset(), &bob_id(), VersionToken::new(4))
            .unwrap()
            .is_some());
    }

    #[test]
    fn compaction_keeps_current_revision() {
        let store = InMemoryRevisionStore::new();
        store.persist(&dataset(), &bob(30)).unwrap();
        store.persist(&dataset(), &bob(31)).unwrap();
        assert_eq!(store.compact(&dataset(), &bob_id(), 0), 1);
        let current = store.get_current(&dataset(), &bob_id()).unwrap().unwrap();
        assert_eq!(current.get("age"), Some(&json!(31)));
    }

    #[test]
    fn compacting_unknown_entity_is_a_noop() {
        let store = InMemoryRevisionStore::new();
        assert_eq!(store.compact(&dataset(), &bob_id(), 1), 0);
    }

    // -----------------------------------------------------------------------
    // Conditional writes
    // -----------------------------------------------------------------------

    #[test]
    fn conditional_write_succeeds_on_matching_version() {
        let store = InMemoryRevisionStore::new();
        let created = store
            .persist_conditional(&dataset(), &bob(30), None)
            .unwrap();
        let updated = store
            .persist_conditional(&dataset(), &bob(31), created.version().unwrap())
            .unwrap();
        assert_eq!(updated.version().unwrap(), Some(VersionToken::new(2)));
    }

    #[test]
    fn conditional_write_rejects_stale_version() {
        let store = InMemoryRevisionStore::new();
        store.persist(&dataset(), &bob(30)).unwrap();
        store.persist(&dataset(), &bob(31)).unwrap();
        let err = store
            .persist_conditional(&dataset(), &bob(32), Some(VersionToken::new(1)))
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionMismatch {
                expected: Some(VersionToken::new(1)),
                actual: Some(VersionToken::new(2)),
            }
        );
        assert_eq!(store.revision_count(&dataset(), &bob_id()), 2);
    }

    #[test]
    fn conditional_create_rejects_existing_entity() {
        let store = InMemoryRevisionStore::new();
        store.persist(&dataset(), &bob(30)).unwrap();
        assert!(matches!(
            store.persist_conditional(&dataset(), &bob(31), None),
            Err(StoreError::VersionMismatch { expected: None, .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    #[test]
    fn seed_preserves_tokens_and_advances_counter() {
        let store = InMemoryRevisionStore::new();
        let history = vec![
            Entity::from_json(json!({"_id": "bob", "age": 30, "_updated": 5})).unwrap(),
            Entity::from_json(json!({"_id": "bob", "age": 31, "_updated": 6})).unwrap(),
        ];
        store.seed(&dataset(), history).unwrap();
        let base = store
            .get_at_version(&dataset(), &bob_id(), VersionToken::new(5))
            .unwrap()
            .unwrap();
        assert_eq!(base.get("age"), Some(&json!(30)));

        let next = store.persist(&dataset(), &bob(32)).unwrap();
        assert_eq!(next.version().unwrap(), Some(VersionToken::new(7)));
    }

    #[test]
    fn seed_rejects_out_of_order_history() {
        let store = InMemoryRevisionStore::new();
        let history = vec![
            Entity::from_json(json!({"_id": "bob", "_updated": 6})).unwrap(),
            Entity::from_json(json!({"_id": "bob", "_updated": 5})).unwrap(),
        ];
        assert!(matches!(
            store.seed(&dataset(), history),
            Err(StoreError::Inconsistent(_))
        ));
    }

    #[test]
    fn seed_rejects_last_token() {
        let store = InMemoryRevisionStore::new();
        let history =
            vec![Entity::from_json(json!({"_id": "bob", "_updated": u64::MAX})).unwrap()];
        assert_eq!(
            store.seed(&dataset(), history),
            Err(StoreError::Inconsistent("version token space exhausted".into()))
        );
        assert_eq!(store.entity_count(), 0);
    }

    #[test]
    fn persist_refuses_to_reuse_tokens_when_exhausted() {
        let store = InMemoryRevisionStore::new();
        let history =
            vec![Entity::from_json(json!({"_id": "bob", "_updated": u64::MAX - 1})).unwrap()];
        store.seed(&dataset(), history).unwrap();

        let err = store.persist(&dataset(), &bob(31)).unwrap_err();
        assert!(matches!(err, StoreError::Inconsistent(_)));
        let err = store
            .persist_conditional(&dataset(), &bob(31), Some(VersionToken::new(u64::MAX - 1)))
            .unwrap_err();
        assert!(matches!(err, StoreError::Inconsistent(_)));
        assert_eq!(store.revision_count(&dataset(), &bob_id()), 1);
    }

    #[test]
    fn seed_rejects_unversioned_revision() {
        let store = InMemoryRevisionStore::new();
        let history = vec![Entity::from_json(json!({"_id": "bob"})).unwrap()];
        assert!(matches!(
            store.seed(&dataset(), history),
            Err(StoreError::Inconsistent(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Failure injection
    // -----------------------------------------------------------------------

    #[test]
    fn injected_failures_are_consumed() {
        let store = InMemoryRevisionStore::new();
        store.fail_next(2);
        assert!(store.get_current(&dataset(), &bob_id()).unwrap_err().is_transient());
        assert!(store.persist(&dataset(), &bob(30)).unwrap_err().is_transient());
        assert!(store.get_current(&dataset(), &bob_id()).unwrap().is_none());
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_writes_receive_unique_tokens() {
        use std::collections::HashSet;
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryRevisionStore::new());
        let handles: Vec<_> = (0..8)
            .map(|age| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .persist(&dataset(), &bob(age))
                        .unwrap()
                        .version()
                        .unwrap()
                        .unwrap()
                })
            })
            .collect();

        let tokens: HashSet<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .collect();
        assert_eq!(tokens.len(), 8);
        assert_eq!(store.revision_count(&dataset(), &bob_id()), 8);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryRevisionStore::new();
        store.persist(&dataset(), &bob(30)).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryRevisionStore"));
        assert!(debug.contains("entity_count"));
    }
}
