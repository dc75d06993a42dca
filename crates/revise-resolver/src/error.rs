use thiserror::Error;

use revise_store::StoreError;
use revise_types::{TypeError, VersionToken};

use crate::conflict::ConflictResult;

/// Errors produced while resolving or applying a write.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The write conflicts with the stored entity and needs caller action.
    #[error(transparent)]
    Conflict(#[from] ConflictResult),

    /// The store failed; no conflict was evaluated.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The proposed or stored entity is malformed.
    #[error("invalid entity: {0}")]
    InvalidEntity(#[from] TypeError),

    /// A conditional write found that another writer persisted first.
    #[error("concurrent write detected: expected version {expected:?}, found {actual:?}")]
    ConcurrentWrite {
        expected: Option<VersionToken>,
        actual: Option<VersionToken>,
    },
}

impl ResolveError {
    /// The conflict, if this error is one.
    pub fn conflict(&self) -> Option<&ConflictResult> {
        match self {
            Self::Conflict(c) => Some(c),
            _ => None,
        }
    }

    /// Returns `true` if running the whole resolution again may succeed
    /// without the caller changing its write.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            Self::ConcurrentWrite { .. } => true,
            Self::Conflict(_) | Self::InvalidEntity(_) => false,
        }
    }
}

/// Result alias for resolver operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors from loading or validating a [`crate::ResolverConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
