//! Split encoding: one postorder pass turning tree topology into bitmasks.
//!
//! Every edge gets a `split_bitmask`, the union of the bits of all taxa
//! descended from it. The [`SplitTable`] maps each encoded bitmask back to
//! its owning edge and is the structure both the resolver and the monophyly
//! check query. Masks are arbitrary-precision integers, so taxon count is
//! never capped by the machine word width.

use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::core::taxon::TaxonIndex;
use crate::core::tree::{NodeIndex, Tree};

/// Configuration for the split encoder
#[derive(Debug, Clone, Copy)]
pub struct SplitOptions {
    /// Collapse outdegree-one nodes before encoding, so the split table only
    /// references topologically meaningful edges
    pub fold_single_child_nodes: bool,

    /// Give internal taxon-bearing nodes their own bit in the masks above
    /// them, supporting trees that label higher-rank groups
    pub include_internal_taxa: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            fold_single_child_nodes: false,
            include_internal_taxa: true,
        }
    }
}

/// Bitmask → edge lookup, one entry per encoded terminal or true-split edge.
///
/// For unrooted trees the table is rebuilt with normalized keys (a split is
/// complemented when the reference bit — the lowest-order bit of the full
/// mask — is unset), so a split and its complement collide to one key.
#[derive(Debug, Clone, Default)]
pub struct SplitTable {
    edges: HashMap<BigUint, NodeIndex>,
    full_mask: BigUint,
    normalized: bool,
}

impl SplitTable {
    fn insert(&mut self, mask: BigUint, edge: NodeIndex) {
        self.edges.insert(mask, edge);
    }

    /// The edge owning `mask`, if the mask is an encoded split of the tree.
    #[must_use]
    pub fn edge_for(&self, mask: &BigUint) -> Option<NodeIndex> {
        if self.normalized {
            self.edges.get(&self.normalize(mask)).copied()
        } else {
            self.edges.get(mask).copied()
        }
    }

    #[must_use]
    pub fn contains(&self, mask: &BigUint) -> bool {
        self.edge_for(mask).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Union of the bits of every taxon present in the tree; equals the root
    /// edge's bitmask.
    #[must_use]
    pub fn full_mask(&self) -> &BigUint {
        &self.full_mask
    }

    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    fn normalize(&self, mask: &BigUint) -> BigUint {
        match self.full_mask.trailing_zeros() {
            Some(reference_bit) if !mask.bit(reference_bit) => &self.full_mask ^ mask,
            _ => mask.clone(),
        }
    }

    /// Rebuilds the table with normalized (unrooted) keys.
    #[must_use]
    pub fn into_normalized(self) -> Self {
        let mut rebuilt = Self {
            edges: HashMap::with_capacity(self.edges.len()),
            full_mask: self.full_mask,
            normalized: true,
        };
        for (mask, edge) in self.edges {
            let key = rebuilt.normalize(&mask);
            rebuilt.edges.insert(key, edge);
        }
        rebuilt
    }
}

/// Runs the postorder encoding pass over `tree`, writing each node's stem
/// edge bitmask and building the split table.
///
/// Callers must fold unary nodes first when
/// `options.fold_single_child_nodes` is set (see [`Tree::fold_unary_nodes`]);
/// the taxon index has to describe the post-fold tree, so folding cannot
/// happen here. Degenerate single-child edges encountered with folding
/// disabled pass their child's bitmask through without a table entry: they
/// are not genuine bipartitions.
pub fn encode_splits(tree: &mut Tree, taxa: &TaxonIndex, options: &SplitOptions) -> SplitTable {
    let mut table = SplitTable::default();
    let order: Vec<NodeIndex> = tree.postorder().collect();

    for index in order {
        let children = tree[index].children.clone();
        let own_bit = tree[index]
            .taxon
            .as_deref()
            .and_then(|taxon| taxa.bit_of(taxon));

        let mask = match children.len() {
            0 => {
                let mask = own_bit.unwrap_or_default();
                if !mask.is_zero() {
                    table.insert(mask.clone(), index);
                }
                mask
            }
            1 => tree[children[0]].split.clone(),
            _ => {
                let mut mask = BigUint::default();
                for &child in &children {
                    mask |= &tree[child].split;
                }
                if options.include_internal_taxa {
                    if let Some(bit) = own_bit {
                        mask |= &bit;
                        table.insert(bit, index);
                    }
                }
                table.insert(mask.clone(), index);
                mask
            }
        };
        tree[index].split = mask;
    }

    if tree.is_root_set() {
        table.full_mask = tree[tree.root_index()].split.clone();
    }
    if !tree.is_rooted() {
        table = table.into_normalized();
    }
    table
}
