//! Report emission: the tab-separated placement table and the relabeled
//! tree.
//!
//! Both outputs share one id space: any node without a taxon id or label is
//! assigned a synthetic `AUTOGENID<n>` on first use, and the assignment
//! sticks, so table rows reference tree positions unambiguously.

use std::io::Write;

use crate::core::tree::NodeIndex;
use crate::core::types::Reason;
use crate::resolve::binder::TreeAnnotator;

/// Writes one row per placed node/edge annotation in preorder, then one
/// `NA` row per annotation that could not be placed.
///
/// # Errors
///
/// Returns any error raised by the underlying writer.
pub fn write_table<W: Write>(annotator: &mut TreeAnnotator, writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "type\ttarget_id\tannotation_id\treason")?;

    let order: Vec<NodeIndex> = annotator.tree().preorder().collect();
    for index in order {
        let node_annotations = annotator.tree()[index].annotations.clone();
        let edge_annotations = annotator.tree()[index].edge_annotations.clone();
        if node_annotations.is_empty() && edge_annotations.is_empty() {
            continue;
        }
        let out_id = annotator.node_out_id(index);
        for id in &node_annotations {
            writeln!(writer, "node\t{out_id}\t{id}\t{}", Reason::Success)?;
        }
        for id in &edge_annotations {
            writeln!(writer, "edge\t{out_id}\t{id}\t{}", Reason::Success)?;
        }
    }

    for (id, outcome) in annotator.unplaced() {
        writeln!(writer, "NA\tNA\t{id}\t{}", outcome.reason)?;
    }
    Ok(())
}

/// Writes the tree as newick with every node labeled by its output id.
///
/// # Errors
///
/// Returns any error raised by the underlying writer.
pub fn write_labeled_tree<W: Write>(
    annotator: &mut TreeAnnotator,
    writer: &mut W,
) -> std::io::Result<()> {
    let newick = labeled_newick(annotator);
    writeln!(writer, "{newick}")
}

/// Renders the annotator's tree as a newick string with output-id labels on
/// every node, assigning `AUTOGENID<n>` labels as needed.
#[must_use]
pub fn labeled_newick(annotator: &mut TreeAnnotator) -> String {
    let root = annotator.tree().root_index();
    let mut out = String::new();
    build_newick(annotator, root, &mut out);
    out.push(';');
    out
}

fn build_newick(annotator: &mut TreeAnnotator, index: NodeIndex, out: &mut String) {
    let children = annotator.tree()[index].children.clone();
    if !children.is_empty() {
        out.push('(');
        for (position, &child) in children.iter().enumerate() {
            if position > 0 {
                out.push(',');
            }
            build_newick(annotator, child, out);
        }
        out.push(')');
    }
    push_label(out, &annotator.node_out_id(index));
    if let Some(length) = annotator.tree()[index].length {
        out.push(':');
        out.push_str(&length.to_string());
    }
}

/// Quotes a label when it contains newick structural characters.
fn push_label(out: &mut String, label: &str) {
    let needs_quoting = label
        .bytes()
        .any(|b| matches!(b, b'(' | b')' | b',' | b':' | b';' | b'[' | b']' | b'\'' | b' '));
    if needs_quoting {
        out.push('\'');
        out.push_str(&label.replace('\'', "''"));
        out.push('\'');
    } else {
        out.push_str(label);
    }
}
