//! Update resolution engine for Revise.
//!
//! Decides, for every incoming write against the external revision store,
//! whether it can be applied as-is, must be three-way merged with the
//! revision that landed in the meantime, or has to be rejected:
//!
//! - **CREATE** -- no stored entity yet; the write is accepted unchanged
//! - **DIRECT_APPLY** -- the write's version token matches the stored one
//! - **MERGED** -- a concurrent write happened; the historical base was
//!   found and the two edits merged cleanly
//! - **Conflict** -- missing version, compacted base, or divergent edits
//!
//! # Known limitation
//!
//! Reading the current revision, deciding, and persisting are three separate
//! store calls. Another writer can persist between the decision and the
//! write, and its revision is then silently superseded. Setting
//! [`ResolverConfig::conditional_writes`] closes the gap on stores that
//! support compare-and-set keyed on the version token.

pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod history;

pub use config::ResolverConfig;
pub use conflict::ConflictResult;
pub use engine::{AppliedWrite, Resolution, ResolutionKind, UpdateResolver};
pub use error::{ConfigError, ResolveError, ResolveResult};
pub use history::{BaseRevision, GoneReason, HistoricalRevisionResolver};
