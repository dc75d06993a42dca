use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;

/// Store-issued version token of an entity revision.
///
/// Tokens are assigned by the store on every successful write and are
/// strictly increasing, so they double as offsets into an entity's
/// history: a token addresses exactly one immutable snapshot until the
/// store compacts it away. Two writes to the same entity never share a
/// token.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(u64);

impl VersionToken {
    /// Create a token from a raw store offset.
    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    /// The raw store offset.
    pub const fn offset(&self) -> u64 {
        self.0
    }

    /// The token that follows this one, or `None` once the token space is
    /// exhausted.
    pub fn checked_next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Parse a token from the JSON value stored in an entity's `_updated`
    /// field. Only non-negative integers are accepted.
    pub fn from_value(value: &Value) -> Result<Self, TypeError> {
        value
            .as_u64()
            .map(Self)
            .ok_or_else(|| TypeError::InvalidVersion(value.to_string()))
    }

    /// The JSON representation written into an entity's `_updated` field.
    pub fn to_value(&self) -> Value {
        Value::from(self.0)
    }
}

impl fmt::Debug for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionToken({})", self.0)
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for VersionToken {
    fn from(offset: u64) -> Self {
        Self(offset)
    }
}
