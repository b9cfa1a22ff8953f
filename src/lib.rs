//! # claderef
//!
//! A library for mapping phyloreference annotations onto phylogenetic trees.
//!
//! A phyloreference names a position in a tree abstractly: a set of taxa the
//! clade must include, optionally a set it must exclude, and declarative
//! checks the placement must satisfy. Resolving one against a concrete tree
//! means finding the node (or the stem edge) the reference designates,
//! verifying the checks, and recording where the annotation landed — or why
//! it could not land.
//!
//! ## How resolution works
//!
//! - Every taxon gets a power-of-two bit; every edge gets a **split
//!   bitmask**, the union of the bits below it, in one postorder pass
//! - The MRCA of the included taxa is found through those masks; for branch
//!   (stem) targets, the resolver walks rootward to the deepest ancestor
//!   whose mask still avoids every excluded taxon
//! - Monophyly checks ask whether a clade's union mask is an exact key of
//!   the split table; exclusion checks ask whether the target edge's mask is
//!   disjoint from the named taxa
//!
//! Masks are arbitrary-precision, so trees are not limited to word-width
//! taxon counts.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use claderef::parsing::{annotations, newick};
//! use claderef::{AnnotatorConfig, TreeAnnotator};
//!
//! let trees = newick::parse_text("((247331,247332)770319,872573);").unwrap();
//! let mut records = annotations::parse_file(Path::new("annotations.json")).unwrap();
//!
//! let tree = trees.into_iter().next().unwrap();
//! let mut annotator = TreeAnnotator::new(tree, AnnotatorConfig::default()).unwrap();
//! for annotation in &mut records {
//!     let outcome = annotator.apply(annotation);
//!     println!("{}: {}", annotation.id, outcome.explain());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Tree arena, taxon index, and annotation records
//! - [`encoding`]: Split bitmask encoding and the split table
//! - [`resolve`]: Target resolution, condition checks, and binding
//! - [`parsing`]: Newick and annotation-JSON readers
//! - [`report`]: Placement table and relabeled-tree emission
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod encoding;
pub mod parsing;
pub mod report;
pub mod resolve;

// Re-export commonly used types for convenience
pub use crate::core::annotation::{Annotation, Condition, ProvEntity, ReferenceTarget};
pub use crate::core::taxon::TaxonIndex;
pub use crate::core::tree::Tree;
pub use crate::core::types::{AttachedElement, IdValue, Reason, TargetKind};
pub use crate::encoding::splits::{encode_splits, SplitOptions, SplitTable};
pub use crate::resolve::binder::{AnnotatorConfig, TreeAnnotator};
pub use crate::resolve::engine::{NoExpansion, ResolveConfig, Resolver, TaxonExpander};
pub use crate::resolve::outcome::MappingOutcome;
