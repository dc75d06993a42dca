//! Foundation types for Revise.
//!
//! This crate provides the data model shared by every other Revise crate:
//! the entities held in the external revision store, the identifiers that
//! address them, the version tokens that order their revisions, and the
//! field values the merge engine compares.
//!
//! # Key Types
//!
//! - [`Entity`] -- Field map with reserved `_id`, `_updated` and `_deleted` fields
//! - [`DatasetId`] / [`EntityId`] -- Non-empty identifiers for datasets and entities
//! - [`VersionToken`] -- Store-issued, totally ordered revision offset
//! - [`FieldValue`] -- A field's value, or the explicit absence of the field

pub mod entity;
pub mod error;
pub mod identity;
pub mod value;
pub mod version;

pub use entity::{Entity, DELETED_FIELD, ID_FIELD, VERSION_FIELD};
pub use error::{TypeError, TypeResult};
pub use identity::{DatasetId, EntityId};
pub use value::FieldValue;
pub use version::VersionToken;
