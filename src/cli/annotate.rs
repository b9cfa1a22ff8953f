use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::encoding::splits::SplitOptions;
use crate::parsing::{annotations, newick};
use crate::report;
use crate::resolve::binder::{AnnotatorConfig, TreeAnnotator};
use crate::resolve::engine::ResolveConfig;

#[derive(Args)]
pub struct AnnotateArgs {
    /// Newick file whose labels are taxonomic ids or use the name_ott<ID>
    /// convention
    #[arg(long)]
    pub tree_file: PathBuf,

    /// File to write the annotation placement table to
    #[arg(long)]
    pub out_table: PathBuf,

    /// File to write the relabeled tree to, with ids matching the table
    #[arg(long)]
    pub out_tree: PathBuf,

    /// Use tree labels verbatim instead of enforcing the id conventions
    #[arg(long)]
    pub verbatim_labels: bool,

    /// Collapse single-child nodes before encoding splits
    #[arg(long)]
    pub fold_unary: bool,

    /// Do not give taxon-bearing internal nodes their own bit
    #[arg(long)]
    pub no_internal_taxa: bool,

    /// JSON file with annotations (one object or a list)
    pub json: PathBuf,
}

/// Execute annotate subcommand
///
/// # Errors
///
/// Returns an error when an input cannot be parsed, the tree's labeling
/// convention is inconsistent, or an output file cannot be written.
pub fn run(args: AnnotateArgs, _verbose: bool) -> anyhow::Result<()> {
    let trees = newick::parse_file(&args.tree_file)
        .with_context(|| format!("reading tree file {}", args.tree_file.display()))?;
    let annotations = annotations::parse_file(&args.json)
        .with_context(|| format!("reading annotations from {}", args.json.display()))?;

    let config = AnnotatorConfig {
        verbatim_labels: args.verbatim_labels,
        split: SplitOptions {
            fold_single_child_nodes: args.fold_unary,
            include_internal_taxa: !args.no_internal_taxa,
        },
        resolve: ResolveConfig::default(),
    };

    let multiple = trees.len() > 1;
    for (index, tree) in trees.into_iter().enumerate() {
        let tree = tree.with_name(format!("tree_{index}"));
        let mut annotator = TreeAnnotator::new(tree, config)?;

        let mut batch = annotations.clone();
        annotator.apply_all(&mut batch);
        info!(
            index,
            tried = annotator.num_tried(),
            bound = annotator.num_bound(),
            "annotated tree"
        );

        let tree_path = output_path(&args.out_tree, index, multiple);
        let mut tree_out = BufWriter::new(
            File::create(&tree_path)
                .with_context(|| format!("creating {}", tree_path.display()))?,
        );
        report::write_labeled_tree(&mut annotator, &mut tree_out)?;

        let table_path = output_path(&args.out_table, index, multiple);
        let mut table_out = BufWriter::new(
            File::create(&table_path)
                .with_context(|| format!("creating {}", table_path.display()))?,
        );
        report::write_table(&mut annotator, &mut table_out)?;
    }

    Ok(())
}

/// With several input trees, each tree gets its own pair of output files,
/// distinguished by an index before the extension.
fn output_path(path: &Path, index: usize, multiple: bool) -> PathBuf {
    if !multiple {
        return path.to_path_buf();
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(extension) => path.with_extension(format!("{index}.{extension}")),
        None => path.with_extension(index.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_single_tree_untouched() {
        let path = Path::new("out/table.tsv");
        assert_eq!(output_path(path, 0, false), PathBuf::from("out/table.tsv"));
    }

    #[test]
    fn test_output_path_multiple_trees_indexed() {
        let path = Path::new("out/table.tsv");
        assert_eq!(
            output_path(path, 1, true),
            PathBuf::from("out/table.1.tsv")
        );
        assert_eq!(output_path(Path::new("table"), 2, true), PathBuf::from("table.2"));
    }
}
