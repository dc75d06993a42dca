use revise_types::{TypeError, VersionToken};

/// Errors from revision store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or failed to answer.
    #[error("store unavailable after {attempts} attempt(s): {reason}")]
    Unavailable { reason: String, attempts: u32 },

    /// The store answered with data that violates its own contract.
    #[error("inconsistent store response: {0}")]
    Inconsistent(String),

    /// A conditional write found a different current version than expected.
    #[error("version mismatch: expected {expected:?}, found {actual:?}")]
    VersionMismatch {
        expected: Option<VersionToken>,
        actual: Option<VersionToken>,
    },

    /// The backend does not implement the requested operation.
    #[error("operation not supported by this store: {0}")]
    Unsupported(&'static str),

    /// An entity handed to the store has no usable `_id`.
    #[error("entity has no _id field")]
    MissingIdentity,

    /// An entity or identifier was malformed.
    #[error("invalid entity: {0}")]
    Invalid(#[from] TypeError),
}

impl StoreError {
    /// A single failed attempt to reach the store.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
            attempts: 1,
        }
    }

    /// Returns `true` if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
