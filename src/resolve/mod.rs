//! Resolution, condition checking, and binding of annotations.
//!
//! - [`engine`]: locates the node or stem edge a reference designates
//! - [`checks`]: evaluates declarative monophyly/exclusion conditions
//! - [`binder`]: the per-tree session applying annotations end to end
//! - [`outcome`]: the result record of one mapping attempt

pub mod binder;
pub mod checks;
pub mod engine;
pub mod outcome;

pub use binder::{AnnotatorConfig, TreeAnnotator};
pub use engine::{NoExpansion, ResolveConfig, Resolver, TaxonExpander};
pub use outcome::MappingOutcome;
