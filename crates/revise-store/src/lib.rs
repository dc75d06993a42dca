//! Revision store contract for Revise.
//!
//! Revise never owns durable entity state. Entities and their history live
//! in an external versioned store that supports exactly three operations:
//! fetch the current revision, fetch the revision at a historical version
//! token, and persist a new revision. The store performs no merging and may
//! compact old revisions away at any time.
//!
//! # Storage Backends
//!
//! All backends implement the [`RevisionStore`] trait:
//!
//! - [`InMemoryRevisionStore`] -- full in-memory history, for tests and embedding
//! - [`RetryingStore`] -- wraps any backend and retries transient failures
//!
//! # Design Rules
//!
//! 1. The store assigns version tokens; callers never invent them.
//! 2. A missing historical revision is `Ok(None)`, never an error.
//! 3. Transport failures are [`StoreError::Unavailable`] and are the only
//!    errors considered transient.
//! 4. Implementations must be safe to share across concurrent requests.

pub mod error;
pub mod memory;
pub mod retry;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryRevisionStore;
pub use retry::{RetryPolicy, RetryingStore};
pub use traits::RevisionStore;
