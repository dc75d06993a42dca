//! Merge engine for Revise.
//!
//! Implements the deterministic, field-level three-way merge that reconciles
//! a stale write with the revision currently in the store, plus the entity
//! diff used to describe edits.
//!
//! # Key Types
//!
//! - [`merge_entities`] -- all-or-nothing merge returning an entity or a [`ConflictReport`]
//! - [`MergeReport`] / [`FieldResolution`] -- per-field outcome of a merge
//! - [`EntityDiff`] / [`FieldChange`] -- field-level diff between two revisions

pub mod diff;
pub mod merge;

pub use diff::{diff_entities, EntityDiff, FieldChange};
pub use merge::{
    merge_entities, merge_fields, ConflictReport, FieldConflict, FieldResolution, MergeReport,
};
