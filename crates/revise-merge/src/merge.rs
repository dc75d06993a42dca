//! Field-by-field three-way merge of two divergent edits.
//!
//! Given the entity a writer submitted (`incoming`), the revision that write
//! was based on (`base`), and the revision currently stored (`current`),
//! every field in the union of the three is resolved independently:
//!
//! | condition                      | result          |
//! |--------------------------------|-----------------|
//! | `incoming == base`             | `current`       |
//! | `base == current`              | `incoming`      |
//! | `incoming == current`          | the shared value|
//! | otherwise                      | conflict        |
//!
//! A missing field is [`FieldValue::Absent`] and takes part in the
//! comparisons like any other value. The merge is all-or-nothing: a single
//! conflicting field rejects the whole write.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use revise_types::{Entity, FieldValue};

/// How a non-conflicting field was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldResolution {
    /// Neither side changed the field.
    Unchanged,
    /// Only the stored side changed the field; its value was kept.
    TookCurrent,
    /// Only the incoming side changed the field; its value was taken.
    TookIncoming,
    /// Both sides made the identical change.
    Convergent,
}

/// A field both sides changed to different values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldConflict {
    pub field: String,
    /// Value proposed by the incoming write.
    pub incoming: FieldValue,
    /// Value currently in the store.
    pub current: FieldValue,
    /// Value in the common base revision.
    pub base: FieldValue,
}

/// Every conflicting field of a failed merge, ordered by field name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub conflicts: Vec<FieldConflict>,
}

impl ConflictReport {
    /// Returns `true` if no field conflicted.
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Number of conflicting fields.
    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// Names of the conflicting fields, in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.conflicts.iter().map(|c| c.field.as_str())
    }

    /// The conflict recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&FieldConflict> {
        self.conflicts.iter().find(|c| c.field == field)
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} conflicting field(s): ", self.len())?;
        for (i, field) in self.fields().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(field)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConflictReport {}

/// Full per-field outcome of a three-way merge.
///
/// Built by [`merge_fields`]. Holds the resolution of every field that did
/// not conflict, the entity assembled from those resolutions, and the
/// conflicts. Use [`MergeReport::into_result`] for the all-or-nothing view.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeReport {
    pub resolutions: BTreeMap<String, FieldResolution>,
    pub conflicts: ConflictReport,
    merged: Entity,
}

impl MergeReport {
    /// Returns `true` if the merge produced no conflicts.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Number of fields resolved with the given resolution.
    pub fn count(&self, resolution: FieldResolution) -> usize {
        self.resolutions.values().filter(|r| **r == resolution).count()
    }

    /// The merged entity, or the conflict report if any field conflicted.
    pub fn into_result(self) -> Result<Entity, ConflictReport> {
        if self.conflicts.is_empty() {
            Ok(self.merged)
        } else {
            Err(self.conflicts)
        }
    }
}

/// Resolve every field of the snapshot triple.
///
/// The field set is the union of the fields of all three entities, visited
/// in lexicographic order, so identical inputs always produce an identical
/// report.
pub fn merge_fields(incoming: &Entity, base: &Entity, current: &Entity) -> MergeReport {
    let names: BTreeSet<&str> = incoming
        .field_names()
        .chain(base.field_names())
        .chain(current.field_names())
        .collect();

    let mut resolutions = BTreeMap::new();
    let mut conflicts = Vec::new();
    let mut merged = Entity::new();

    for name in names {
        let proposed = incoming.field(name);
        let stored = current.field(name);
        let ancestor = base.field(name);

        let (value, resolution) = if proposed == ancestor {
            let resolution = if ancestor == stored {
                FieldResolution::Unchanged
            } else {
                FieldResolution::TookCurrent
            };
            (stored, resolution)
        } else if ancestor == stored {
            (proposed, FieldResolution::TookIncoming)
        } else if proposed == stored {
            (stored, FieldResolution::Convergent)
        } else {
            conflicts.push(FieldConflict {
                field: name.to_string(),
                incoming: proposed,
                current: stored,
                base: ancestor,
            });
            continue;
        };

        if let FieldValue::Present(v) = value {
            merged.insert(name, v);
        }
        resolutions.insert(name.to_string(), resolution);
    }

    let report = MergeReport {
        resolutions,
        conflicts: ConflictReport { conflicts },
        merged,
    };
    debug!(
        took_incoming = report.count(FieldResolution::TookIncoming),
        took_current = report.count(FieldResolution::TookCurrent),
        convergent = report.count(FieldResolution::Convergent),
        conflicts = report.conflicts.len(),
        "three-way merge evaluated"
    );
    report
}

/// Merge two divergent edits of `base`.
///
/// Returns the merged entity when no field conflicts, otherwise the full
/// conflict report and no entity. The merged entity's `_updated` field is
/// whatever the field rules produced; the store assigns the real token
/// when it is persisted.
pub fn merge_entities(
    incoming: &Entity,
    base: &Entity,
    current: &Entity,
) -> Result<Entity, ConflictReport> {
    merge_fields(incoming, base, current).into_result()
}
