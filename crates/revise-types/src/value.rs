use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The value of a single entity field, as seen by the merge engine.
///
/// A field that is missing from an entity is [`FieldValue::Absent`], which
/// is never equal to any present value, including JSON `null`. Present
/// values compare by deep structural equality.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// The field does not exist in the entity.
    #[default]
    Absent,
    /// The field exists with the given value (which may be `null`).
    Present(Value),
}

impl FieldValue {
    /// Build from an optional borrowed value, cloning when present.
    pub fn from_option(value: Option<&Value>) -> Self {
        match value {
            Some(v) => Self::Present(v.clone()),
            None => Self::Absent,
        }
    }

    /// The present value, if any.
    pub fn as_present(&self) -> Option<&Value> {
        match self {
            Self::Present(v) => Some(v),
            Self::Absent => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Present(value)
    }
}

impl From<Option<Value>> for FieldValue {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(v) => Self::Present(v),
            None => Self::Absent,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("<absent>"),
            Self::Present(v) => write!(f, "{v}"),
        }
    }
}
