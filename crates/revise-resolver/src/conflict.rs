//! Structured conflicts returned to the caller of the resolver.
//!
//! Each variant carries the entities involved so a caller can render a diff
//! or ask a human to resolve the write. [`ConflictResult::to_body`] produces
//! the JSON body an HTTP layer would return alongside
//! [`ConflictResult::status_code`].

use serde_json::{json, Map, Value};
use thiserror::Error;

use revise_merge::{ConflictReport, FieldConflict};
use revise_types::{Entity, VersionToken};

use crate::history::GoneReason;

/// HTTP status shared by every conflict variant.
pub const CONFLICT_STATUS: u16 = 409;

/// A write that cannot be applied without the caller's intervention.
///
/// `ours` is the entity currently in the store, `yours` is the write as
/// submitted (with its `_id` set to the target identity).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConflictResult {
    /// The entity exists and the write declared no base version.
    #[error("entity already exists and the write declares no base version")]
    MissingVersion { ours: Entity, yours: Entity },

    /// The write's base revision can no longer be retrieved.
    #[error("base revision {declared} is unavailable ({reason:?})")]
    BaseRevisionGone {
        reason: GoneReason,
        declared: VersionToken,
        ours: Entity,
        yours: Entity,
    },

    /// Both writers changed at least one field to different values.
    #[error("automatic merge failed: {report}")]
    MergeConflict {
        report: ConflictReport,
        ours: Entity,
        base: Entity,
        yours: Entity,
    },
}

impl ConflictResult {
    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingVersion { .. } => "missing_version",
            Self::BaseRevisionGone { .. } => "base_revision_gone",
            Self::MergeConflict { .. } => "merge_conflict",
        }
    }

    /// Human-readable explanation for the caller.
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingVersion { .. } => {
                "Entity already exists, you need to GET the resource and modify it before you post it back"
            }
            Self::BaseRevisionGone { .. } => {
                "Entity has been updated and the revision this update is based on is no longer available"
            }
            Self::MergeConflict { .. } => {
                "There has been a conflict. Can't perform automatic merge."
            }
        }
    }

    /// Status code a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        CONFLICT_STATUS
    }

    /// The entity currently in the store.
    pub fn ours(&self) -> &Entity {
        match self {
            Self::MissingVersion { ours, .. }
            | Self::BaseRevisionGone { ours, .. }
            | Self::MergeConflict { ours, .. } => ours,
        }
    }

    /// The write as submitted.
    pub fn yours(&self) -> &Entity {
        match self {
            Self::MissingVersion { yours, .. }
            | Self::BaseRevisionGone { yours, .. }
            | Self::MergeConflict { yours, .. } => yours,
        }
    }

    /// JSON response body describing the conflict.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("kind".into(), json!(self.kind()));
        body.insert("message".into(), json!(self.message()));
        body.insert("ours".into(), self.ours().to_json());
        body.insert("yours".into(), self.yours().to_json());
        match self {
            Self::MissingVersion { .. } => {}
            Self::BaseRevisionGone {
                reason, declared, ..
            } => {
                body.insert("reason".into(), json!(reason));
                body.insert("declared_version".into(), declared.to_value());
            }
            Self::MergeConflict { report, base, .. } => {
                body.insert("base".into(), base.to_json());
                body.insert(
                    "conflicts".into(),
                    Value::Array(report.conflicts.iter().map(conflict_body).collect()),
                );
            }
        }
        Value::Object(body)
    }
}

// Absent values are omitted rather than rendered as null.
fn conflict_body(conflict: &FieldConflict) -> Value {
    let mut entry = Map::new();
    entry.insert("field".into(), json!(conflict.field));
    for (key, value) in [
        ("incoming", &conflict.incoming),
        ("current", &conflict.current),
        ("base", &conflict.base),
    ] {
        if let Some(v) = value.as_present() {
            entry.insert(key.into(), v.clone());
        }
    }
    Value::Object(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use revise_merge::merge_entities;

    fn entity(value: Value) -> Entity {
        Entity::from_json(value).unwrap()
    }

    #[test]
    fn all_variants_map_to_conflict_status() {
        let ours = entity(json!({"_id": "bob", "_updated": 6}));
        let yours = entity(json!({"_id": "bob"}));
        let missing = ConflictResult::MissingVersion {
            ours: ours.clone(),
            yours: yours.clone(),
        };
        let gone = ConflictResult::BaseRevisionGone {
            reason: GoneReason::Compacted,
            declared: VersionToken::new(5),
            ours,
            yours,
        };
        assert_eq!(missing.status_code(), 409);
        assert_eq!(gone.status_code(), 409);
        assert_ne!(missing.message(), gone.message());
    }

    #[test]
    fn missing_version_body() {
        let conflict = ConflictResult::MissingVersion {
            ours: entity(json!({"_id": "bob", "_updated": 6})),
            yours: entity(json!({"_id": "bob", "age": 40})),
        };
        let body = conflict.to_body();
        assert_eq!(body["kind"], "missing_version");
        assert_eq!(body["ours"]["_updated"], 6);
        assert_eq!(body["yours"]["age"], 40);
        assert!(body.get("base").is_none());
    }

    #[test]
    fn base_gone_body_names_reason() {
        let conflict = ConflictResult::BaseRevisionGone {
            reason: GoneReason::NeverIssued,
            declared: VersionToken::new(99),
            ours: entity(json!({"_id": "bob", "_updated": 6})),
            yours: entity(json!({"_id": "bob", "_updated": 99})),
        };
        let body = conflict.to_body();
        assert_eq!(body["kind"], "base_revision_gone");
        assert_eq!(body["reason"], "never_issued");
        assert_eq!(body["declared_version"], 99);
    }

    #[test]
    fn merge_conflict_body_lists_fields() {
        let base = entity(json!({"_id": "bob", "age": 30, "email": "b@x"}));
        let ours = entity(json!({"_id": "bob", "age": 31}));
        let yours = entity(json!({"_id": "bob", "age": 32, "email": "bob@y"}));
        let report = merge_entities(&yours, &base, &ours).unwrap_err();

        let conflict = ConflictResult::MergeConflict {
            report,
            ours,
            base,
            yours,
        };
        let body = conflict.to_body();
        assert_eq!(body["kind"], "merge_conflict");
        assert_eq!(body["base"]["age"], 30);
        assert_eq!(
            body["conflicts"],
            json!([
                {"field": "age", "incoming": 32, "current": 31, "base": 30},
                {"field": "email", "incoming": "bob@y", "base": "b@x"},
            ])
        );
    }

    #[test]
    fn display_includes_report() {
        let base = entity(json!({"age": 30}));
        let ours = entity(json!({"age": 31}));
        let yours = entity(json!({"age": 32}));
        let report = merge_entities(&yours, &base, &ours).unwrap_err();
        let conflict = ConflictResult::MergeConflict {
            report,
            ours,
            base,
            yours,
        };
        assert_eq!(
            conflict.to_string(),
            "automatic merge failed: 1 conflicting field(s): age"
        );
    }
}
