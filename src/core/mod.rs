//! Core data types for phyloreference mapping.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`Tree`], [`Node`]: Arena-based rooted tree with per-edge split state
//! - [`TaxonIndex`]: Label → position / bit / node lookups for one tree
//! - [`Annotation`], [`ReferenceTarget`], [`Condition`]: Deserialized
//!   annotation records and their declarative checks
//! - [`IdValue`], [`TargetKind`], [`Reason`], [`AttachedElement`]: Small
//!   shared vocabulary types
//!
//! ## Taxon Labeling
//!
//! Trees are expected to identify taxa by stable taxonomic ids. Two label
//! conventions are accepted in taxonomy mode:
//!
//! | Convention | Example |
//! |------------|---------|
//! | bare id    | `247331` |
//! | suffixed   | `Canis_lupus_ott247331` |
//!
//! Mixing conventions is a fatal error; verbatim mode skips the scheme and
//! uses labels exactly as written.

pub mod annotation;
pub mod taxon;
pub mod tree;
pub mod types;

pub use annotation::{Annotation, Condition, ProvEntity, ReferenceTarget};
pub use taxon::TaxonIndex;
pub use tree::{Node, Tree};
pub use types::{AttachedElement, IdValue, Reason, TargetKind};
