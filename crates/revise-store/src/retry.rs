//! Caller-configured retries around a [`RevisionStore`].
//!
//! The resolution engine never retries on its own. Callers that want to ride
//! out transient store outages wrap their client in a [`RetryingStore`],
//! which retries [`StoreError::Unavailable`] with exponential backoff and
//! passes every other error through untouched.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use revise_types::{DatasetId, Entity, EntityId, VersionToken};

use crate::error::{StoreError, StoreResult};
use crate::traits::RevisionStore;

/// Retry schedule for transient store failures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff_ms: u64,
    /// Upper bound on any single delay.
    pub max_backoff_ms: u64,
    /// Growth factor applied to the delay after each retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 50,
            max_backoff_ms: 2_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Retry up to `max_attempts` times with no delay between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            multiplier: 1.0,
        }
    }

    /// Delay to wait before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exp = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let ms = (self.initial_backoff_ms as f64) * self.multiplier.powi(exp);
        let capped = ms.min(self.max_backoff_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// A [`RevisionStore`] that retries transient failures of an inner store.
#[derive(Debug)]
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: RevisionStore> RetryingStore<S> {
    /// Wrap `inner` with the given retry policy.
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The active retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn with_retry<T>(
        &self,
        operation: &'static str,
        call: impl Fn(&S) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let max = self.policy.attempts();
        let mut attempt = 1;
        loop {
            match call(&self.inner) {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "store call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(StoreError::Unavailable { reason, .. }) if attempt < max => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = max,
                        delay_ms = delay.as_millis() as u64,
                        %reason,
                        "transient store failure; retrying"
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    attempt += 1;
                }
                Err(StoreError::Unavailable { reason, .. }) => {
                    warn!(operation, attempts = attempt, %reason, "store retries exhausted");
                    return Err(StoreError::Unavailable {
                        reason,
                        attempts: attempt,
                    });
                }
                Err(other) => return Err(other),
            }
        }
    }
}

impl<S: RevisionStore> RevisionStore for RetryingStore<S> {
    fn get_current(&self, dataset: &DatasetId, id: &EntityId) -> StoreResult<Option<Entity>> {
        self.with_retry("get_current", |s| s.get_current(dataset, id))
    }

    fn get_at_version(
        &self,
        dataset: &DatasetId,
        id: &EntityId,
        version: VersionToken,
    ) -> StoreResult<Option<Entity>> {
        self.with_retry("get_at_version", |s| s.get_at_version(dataset, id, version))
    }

    fn persist(&self, dataset: &DatasetId, entity: &Entity) -> StoreResult<Entity> {
        self.with_retry("persist", |s| s.persist(dataset, entity))
    }

    fn persist_conditional(
        &self,
        dataset: &DatasetId,
        entity: &Entity,
        expected: Option<VersionToken>,
    ) -> StoreResult<Entity> {
        self.with_retry("persist_conditional", |s| {
            s.persist_conditional(dataset, entity, expected)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRevisionStore;
    use serde_json::json;

    fn dataset() -> DatasetId {
        DatasetId::new("people").unwrap()
    }

    fn bob() -> Entity {
        Entity::from_json(json!({"_id": "bob", "age": 30})).unwrap()
    }

    #[test]
    fn default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.initial_backoff_ms, 50);
        assert_eq!(p.max_backoff_ms, 2_000);
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let p = RetryPolicy {
            max_attempts: 10,
            initial_backoff_ms: 100,
            max_backoff_ms: 500,
            multiplier: 2.0,
        };
        assert_eq!(p.backoff(1), Duration::from_millis(100));
        assert_eq!(p.backoff(2), Duration::from_millis(200));
        assert_eq!(p.backoff(3), Duration::from_millis(400));
        assert_eq!(p.backoff(4), Duration::from_millis(500));
        assert_eq!(p.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn zero_attempts_still_calls_once() {
        let store = RetryingStore::new(InMemoryRevisionStore::new(), RetryPolicy::immediate(0));
        store.inner().fail_next(1);
        let err = store.persist(&dataset(), &bob()).unwrap_err();
        assert_eq!(
            err,
            StoreError::Unavailable {
                reason: "injected failure".into(),
                attempts: 1
            }
        );
    }

    #[test]
    fn transient_failures_are_retried() {
        let store = RetryingStore::new(InMemoryRevisionStore::new(), RetryPolicy::immediate(3));
        store.inner().fail_next(2);
        let stored = store.persist(&dataset(), &bob()).unwrap();
        assert_eq!(stored.version().unwrap(), Some(VersionToken::new(1)));
    }

    #[test]
    fn exhaustion_reports_attempt_count() {
        let store = RetryingStore::new(InMemoryRevisionStore::new(), RetryPolicy::immediate(3));
        store.inner().fail_next(5);
        let id = EntityId::new("bob").unwrap();
        match store.get_current(&dataset(), &id) {
            Err(StoreError::Unavailable { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected Unavailable, got {other:?}"),
        }
        // Two injected failures remain for later callers.
        assert!(store.inner().get_current(&dataset(), &id).is_err());
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let store = RetryingStore::new(InMemoryRevisionStore::new(), RetryPolicy::immediate(5));
        store.persist(&dataset(), &bob()).unwrap();
        let err = store
            .persist_conditional(&dataset(), &bob(), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionMismatch { .. }));
        assert_eq!(
            store
                .inner()
                .revision_count(&dataset(), &EntityId::new("bob").unwrap()),
            1
        );
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let p: RetryPolicy = serde_json::from_value(json!({"max_attempts": 7})).unwrap();
        assert_eq!(p.max_attempts, 7);
        assert_eq!(p.multiplier, 2.0);
    }
}
