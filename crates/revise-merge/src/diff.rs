//! Field-level diff between two revisions of an entity.
//!
//! The diff detects field additions, removals, and value modifications.
//! Changes are listed in lexicographic field order.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use revise_types::Entity;

/// The result of comparing two entity revisions.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EntityDiff {
    /// The list of field changes.
    pub changes: Vec<FieldChange>,
}

impl EntityDiff {
    /// Returns `true` if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Number of added fields.
    pub fn additions(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, FieldChange::Added { .. }))
            .count()
    }

    /// Number of removed fields.
    pub fn removals(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, FieldChange::Removed { .. }))
            .count()
    }

    /// Number of modified fields.
    pub fn modifications(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, FieldChange::Modified { .. }))
            .count()
    }

    /// Names of all changed fields, in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(FieldChange::field)
    }
}

/// A single change to an entity field.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldChange {
    /// A new field was added.
    Added { field: String, value: Value },
    /// An existing field was removed.
    Removed { field: String, value: Value },
    /// An existing field's value was modified.
    Modified { field: String, old: Value, new: Value },
}

impl FieldChange {
    /// The name of the changed field.
    pub fn field(&self) -> &str {
        match self {
            Self::Added { field, .. } | Self::Removed { field, .. } | Self::Modified { field, .. } => {
                field
            }
        }
    }
}

/// Compute the diff between two revisions of an entity.
///
/// Fields present only in `new` are `Added`, fields present only in `old`
/// are `Removed`, and fields present in both with different values are
/// `Modified`. A field holding `null` is present.
pub fn diff_entities(old: &Entity, new: &Entity) -> EntityDiff {
    let names: BTreeSet<&str> = old.field_names().chain(new.field_names()).collect();

    let changes = names
        .into_iter()
        .filter_map(|name| match (old.get(name), new.get(name)) {
            (Some(o), Some(n)) if o != n => Some(FieldChange::Modified {
                field: name.to_string(),
                old: o.clone(),
                new: n.clone(),
            }),
            (Some(o), None) => Some(FieldChange::Removed {
                field: name.to_string(),
                value: o.clone(),
            }),
            (None, Some(n)) => Some(FieldChange::Added {
                field: name.to_string(),
                value: n.clone(),
            }),
            _ => None,
        })
        .collect();

    EntityDiff { changes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        Entity::from_json(value).unwrap()
    }

    #[test]
    fn identical_entities_no_diff() {
        let e = entity(json!({"a": 1, "b": "hello"}));
        assert!(diff_entities(&e, &e).is_empty());
    }

    #[test]
    fn empty_to_populated() {
        let diff = diff_entities(&Entity::new(), &entity(json!({"x": 42, "y": "new"})));
        assert_eq!(diff.len(), 2);
        assert_eq!(diff.additions(), 2);
        assert_eq!(diff.removals(), 0);
    }

    #[test]
    fn populated_to_empty() {
        let diff = diff_entities(&entity(json!({"x": 42})), &Entity::new());
        assert_eq!(diff.removals(), 1);
    }

    #[test]
    fn single_field_modification() {
        let diff = diff_entities(&entity(json!({"count": 1})), &entity(json!({"count": 2})));
        assert_eq!(
            diff.changes,
            vec![FieldChange::Modified {
                field: "count".into(),
                old: json!(1),
                new: json!(2),
            }]
        );
    }

    #[test]
    fn mixed_changes_are_ordered_by_field() {
        let old = entity(json!({"keep": true, "modify": "old", "remove": 42}));
        let new = entity(json!({"keep": true, "modify": "new", "added": [1, 2, 3]}));

        let diff = diff_entities(&old, &new);
        assert_eq!(diff.fields().collect::<Vec<_>>(), vec!["added", "modify", "remove"]);
        assert_eq!(diff.additions(), 1);
        assert_eq!(diff.removals(), 1);
        assert_eq!(diff.modifications(), 1);
    }

    #[test]
    fn nested_value_modification() {
        let old = entity(json!({"config": {"debug": false, "port": 8080}}));
        let new = entity(json!({"config": {"debug": true, "port": 8080}}));
        assert_eq!(diff_entities(&old, &new).modifications(), 1);
    }

    #[test]
    fn null_is_not_absence() {
        let diff = diff_entities(&Entity::new(), &entity(json!({"nickname": null})));
        assert_eq!(diff.additions(), 1);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let diff = diff_entities(&Entity::new(), &entity(json!({"a": 1})));
        assert_eq!(
            serde_json::to_value(&diff).unwrap(),
            json!({"changes": [{"kind": "added", "field": "a", "value": 1}]})
        );
    }
}
