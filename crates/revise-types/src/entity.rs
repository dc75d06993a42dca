//! The entity record held in the revision store.
//!
//! An [`Entity`] is a flat map from field name to JSON value. Three field
//! names are reserved and interpreted by Revise:
//!
//! - [`ID_FIELD`] (`_id`): the entity's identity within its dataset
//! - [`VERSION_FIELD`] (`_updated`): the store-issued [`VersionToken`]
//! - [`DELETED_FIELD`] (`_deleted`): logical deletion marker
//!
//! All other fields are opaque to Revise and are only compared for equality.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TypeError, TypeResult};
use crate::identity::EntityId;
use crate::value::FieldValue;
use crate::version::VersionToken;

/// Reserved field holding the entity identity.
pub const ID_FIELD: &str = "_id";
/// Reserved field holding the version token.
pub const VERSION_FIELD: &str = "_updated";
/// Reserved field flagging the entity as logically deleted.
pub const DELETED_FIELD: &str = "_deleted";

/// A versioned record: field name to value, ordered by field name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity {
    fields: BTreeMap<String, Value>,
}

impl Entity {
    /// Create an entity with no fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a JSON value into an entity. The value must be an object.
    pub fn from_json(value: Value) -> TypeResult<Self> {
        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(TypeError::NotAnObject(json_kind(&other).into())),
        }
    }

    /// Parse an entity from JSON text.
    pub fn from_json_str(text: &str) -> TypeResult<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Self::from_json(value)
    }

    /// The entity as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }

    // -----------------------------------------------------------------------
    // Reserved fields
    // -----------------------------------------------------------------------

    /// The `_id` field, if it is present and a string.
    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Overwrite the `_id` field.
    pub fn set_id(&mut self, id: &EntityId) {
        self.fields
            .insert(ID_FIELD.to_string(), Value::String(id.as_str().to_string()));
    }

    /// The version token this entity carries.
    ///
    /// A missing or `null` `_updated` field means the entity declares no
    /// version. Any other non-integer value is an error.
    pub fn version(&self) -> TypeResult<Option<VersionToken>> {
        match self.fields.get(VERSION_FIELD) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => VersionToken::from_value(v).map(Some),
        }
    }

    /// Stamp the entity with a version token.
    pub fn set_version(&mut self, token: VersionToken) {
        self.fields.insert(VERSION_FIELD.to_string(), token.to_value());
    }

    /// Returns `true` if the entity carries `_deleted: true`.
    pub fn is_deleted(&self) -> bool {
        matches!(self.fields.get(DELETED_FIELD), Some(Value::Bool(true)))
    }

    /// Flag the entity as logically deleted.
    pub fn mark_deleted(&mut self) {
        self.fields.insert(DELETED_FIELD.to_string(), Value::Bool(true));
    }

    // -----------------------------------------------------------------------
    // Field access
    // -----------------------------------------------------------------------

    /// The value of a field, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The value of a field as a [`FieldValue`], distinguishing absence.
    pub fn field(&self, name: &str) -> FieldValue {
        FieldValue::from_option(self.fields.get(name))
    }

    /// Returns `true` if the field is present (even if `null`).
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(name.into(), value)
    }

    /// Field names in lexicographic order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields, reserved fields included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the entity has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Value)> for Entity {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
