//! Taxon indexing: sequential positions and power-of-two bits per taxon.
//!
//! The index is built once per tree, after label normalization and any
//! unary-node folding, and is read-only from then on. Positions follow a
//! defined enumeration order (preorder over live taxon-bearing nodes) so
//! bit assignment is deterministic for a given tree.

use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::One;
use thiserror::Error;

use crate::core::tree::{NodeIndex, Tree};

#[derive(Error, Debug)]
pub enum TaxonError {
    #[error("duplicate taxon label in tree: {0:?}")]
    DuplicateLabel(String),

    #[error(
        "taxon label {0:?} is neither a numeric id nor a name_ott<ID> label; \
         tree labels must follow one consistent convention"
    )]
    AmbiguousLabeling(String),
}

/// Label → position / bit / node lookups for one tree.
#[derive(Debug, Clone, Default)]
pub struct TaxonIndex {
    labels: Vec<String>,
    position: HashMap<String, usize>,
    node: HashMap<String, NodeIndex>,
}

impl TaxonIndex {
    /// Builds the index over every live taxon-bearing node of `tree`.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonError::DuplicateLabel`] if two nodes carry the same
    /// taxon label.
    pub fn build(tree: &Tree) -> Result<Self, TaxonError> {
        let mut index = Self::default();
        for node_index in tree.preorder() {
            let Some(taxon) = tree[node_index].taxon.clone() else {
                continue;
            };
            if index.position.contains_key(&taxon) {
                return Err(TaxonError::DuplicateLabel(taxon));
            }
            index.position.insert(taxon.clone(), index.labels.len());
            index.node.insert(taxon.clone(), node_index);
            index.labels.push(taxon);
        }
        Ok(index)
    }

    /// Number of indexed taxa.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.position.contains_key(label)
    }

    /// 0-based position of a taxon in enumeration order.
    #[must_use]
    pub fn position_of(&self, label: &str) -> Option<usize> {
        self.position.get(label).copied()
    }

    /// The taxon's bit, `2^position`.
    #[must_use]
    pub fn bit_of(&self, label: &str) -> Option<BigUint> {
        self.position_of(label).map(|p| BigUint::one() << p)
    }

    /// The node carrying this taxon.
    #[must_use]
    pub fn node_of(&self, label: &str) -> Option<NodeIndex> {
        self.node.get(label).copied()
    }

    /// Taxon labels in enumeration order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Rewrites every taxon label in `tree` to a bare taxonomic id.
///
/// Two conventions are accepted: either every label is already a pure
/// numeric id, or every label carries a trailing `ott<ID>` token separated
/// by `_` or space (`Canis_lupus_ott247331` → `247331`). Trees mixing the
/// two, or labels matching neither, abort the whole run: split encoding
/// cannot proceed without a consistent id scheme.
///
/// # Errors
///
/// Returns [`TaxonError::AmbiguousLabeling`] naming the offending label.
pub fn normalize_ott_labels(tree: &mut Tree) -> Result<(), TaxonError> {
    let taxon_nodes: Vec<NodeIndex> = tree
        .preorder()
        .filter(|&i| tree[i].taxon.is_some())
        .collect();

    let all_numeric = taxon_nodes.iter().all(|&i| {
        tree[i]
            .taxon
            .as_deref()
            .is_some_and(|t| t.parse::<i64>().is_ok())
    });
    if all_numeric {
        return Ok(());
    }

    for index in taxon_nodes {
        let Some(label) = tree[index].taxon.clone() else {
            continue;
        };
        let id = ott_suffix(&label).ok_or(TaxonError::AmbiguousLabeling(label))?;
        tree[index].taxon = Some(id);
    }
    Ok(())
}

/// Extracts the `<ID>` from a trailing `ott<ID>` token, trying `_` then
/// space as the separator. The token must follow a name part: a bare
/// `ott123` is not a valid label under the convention.
fn ott_suffix(label: &str) -> Option<String> {
    for separator in ['_', ' '] {
        let mut parts = label.rsplitn(2, separator);
        let last = parts.next()?;
        if parts.next().is_none() {
            continue;
        }
        if let Some(id) = last.strip_prefix("ott") {
            if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
                return Some(id.to_string());
            }
        }
    }
    None
}
