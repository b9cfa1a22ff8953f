//! Command-line interface for claderef.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **annotate**: Map annotations onto trees and write the placement report
//! - **validate**: Parse and validate an annotation file
//!
//! ## Usage
//!
//! ```text
//! # Annotate a tree, writing the relabeled tree and the placement table
//! claderef annotate --tree-file canids.tre \
//!     --out-tree out.tre --out-table out.tsv annotations.json
//!
//! # Tree labels are not taxonomic ids: use them verbatim
//! claderef annotate --tree-file study.tre --verbatim-labels \
//!     --out-tree out.tre --out-table out.tsv annotations.json
//!
//! # Check an annotation file without a tree
//! claderef validate annotations.json
//! ```

use clap::{Parser, Subcommand};

pub mod annotate;
pub mod validate;

#[derive(Parser)]
#[command(name = "claderef")]
#[command(version)]
#[command(about = "Map phyloreference annotations onto phylogenetic trees")]
#[command(
    long_about = "claderef resolves phyloreference annotations (sets of taxa to include and exclude) to concrete nodes or stem edges of rooted trees.\n\nEach annotation is resolved against the tree's split bitmasks, its declared monophyly/exclusion checks are evaluated, and the outcome is reported as a tab-separated table next to a relabeled copy of the tree."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Map annotations onto trees and write the placement report
    Annotate(annotate::AnnotateArgs),

    /// Parse and validate an annotation file
    Validate(validate::ValidateArgs),
}
