use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("{kind} identifier must not be empty")]
    EmptyIdentifier { kind: &'static str },

    #[error("invalid version token: {0}")]
    InvalidVersion(String),

    #[error("entity must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
