//! Reference resolution: locating the node or stem edge a phyloreference
//! designates.
//!
//! The resolver borrows a fully encoded tree (taxon index + split table) and
//! is a pure computation over it; resolving the same target twice yields the
//! same outcome.

use num_bigint::BigUint;
use num_traits::Zero;
use tracing::debug;

use crate::core::annotation::ReferenceTarget;
use crate::core::taxon::TaxonIndex;
use crate::core::tree::{NodeIndex, Tree};
use crate::core::types::{AttachedElement, IdValue, Reason, TargetKind};
use crate::encoding::splits::SplitTable;
use crate::resolve::outcome::MappingOutcome;

/// Seam for taxonomic-id expansion. An implementation may expand a
/// higher-rank id into the leaf-level ids it covers; results are expected to
/// be deterministic within a run. The default expander maps every id to
/// itself.
pub trait TaxonExpander {
    fn expand(&self, id: &IdValue) -> Vec<IdValue>;
}

/// Identity expansion: every id stands for itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExpansion;

impl TaxonExpander for NoExpansion {
    fn expand(&self, id: &IdValue) -> Vec<IdValue> {
        vec![id.clone()]
    }
}

/// Configuration for the resolver
#[derive(Debug, Clone, Copy)]
pub struct ResolveConfig {
    /// Whether excluded ids pass through the expansion seam like included
    /// ids do
    pub expand_excluded: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            expand_excluded: true,
        }
    }
}

/// Resolves reference targets against one encoded tree.
pub struct Resolver<'a, E: TaxonExpander = NoExpansion> {
    pub(crate) tree: &'a Tree,
    pub(crate) taxa: &'a TaxonIndex,
    pub(crate) splits: &'a SplitTable,
    pub(crate) expander: E,
    pub(crate) config: ResolveConfig,
}

impl<'a> Resolver<'a, NoExpansion> {
    #[must_use]
    pub fn new(tree: &'a Tree, taxa: &'a TaxonIndex, splits: &'a SplitTable) -> Self {
        Self {
            tree,
            taxa,
            splits,
            expander: NoExpansion,
            config: ResolveConfig::default(),
        }
    }
}

impl<'a, E: TaxonExpander> Resolver<'a, E> {
    #[must_use]
    pub fn with_expander<F: TaxonExpander>(self, expander: F) -> Resolver<'a, F> {
        Resolver {
            tree: self.tree,
            taxa: self.taxa,
            splits: self.splits,
            expander,
            config: self.config,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ResolveConfig) -> Self {
        self.config = config;
        self
    }

    /// Dispatches on the target kind.
    #[must_use]
    pub fn resolve(&self, target: &ReferenceTarget) -> MappingOutcome {
        match target.kind {
            TargetKind::Node => self.resolve_node_target(target),
            TargetKind::Branch => self.resolve_branch_target(target),
        }
    }

    /// Resolves a node-based target to the MRCA of its included taxa.
    ///
    /// A target with exactly one included taxon present resolves directly to
    /// the node carrying that taxon.
    #[must_use]
    pub fn resolve_node_target(&self, target: &ReferenceTarget) -> MappingOutcome {
        let (included, dropped_included) = self.taxa_in_tree(&target.included_ids, true);
        if included.is_empty() {
            return MappingOutcome::failure(
                Reason::NoIncludedInTree,
                dropped_included,
                Vec::new(),
            );
        }

        let Some(node) = self.mrca(&included) else {
            return MappingOutcome::failure(
                Reason::NoIncludedInTree,
                dropped_included,
                Vec::new(),
            );
        };
        debug!(node, "resolved node-based target");
        MappingOutcome::success(AttachedElement::Node(node), dropped_included, Vec::new())
    }

    /// Resolves a branch-based target to a stem edge.
    ///
    /// With no excluded taxon present the stem target is the root edge.
    /// Otherwise the MRCA of the included taxa must not contain any excluded
    /// taxon, and the stem is the edge of the deepest (rootward-most)
    /// ancestor whose bitmask still shares no bit with the exclusion mask.
    #[must_use]
    pub fn resolve_branch_target(&self, target: &ReferenceTarget) -> MappingOutcome {
        let (included, dropped_included) = self.taxa_in_tree(&target.included_ids, true);
        if included.is_empty() {
            return MappingOutcome::failure(
                Reason::NoIncludedInTree,
                dropped_included,
                Vec::new(),
            );
        }

        let (excluded, dropped_excluded) =
            self.taxa_in_tree(&target.excluded_ids, self.config.expand_excluded);
        if excluded.is_empty() {
            debug!("no excluded taxa in tree, stem target is the root edge");
            return MappingOutcome::success(
                AttachedElement::Edge(self.tree.root_index()),
                dropped_included,
                dropped_excluded,
            );
        }
        let exclusion_mask = self.union_mask(&excluded);

        let Some(mrca) = self.mrca(&included) else {
            return MappingOutcome::failure(
                Reason::NoIncludedInTree,
                dropped_included,
                dropped_excluded,
            );
        };
        if !(&self.tree[mrca].split & &exclusion_mask).is_zero() {
            return MappingOutcome::failure(
                Reason::MrcaHasExcluded,
                dropped_included,
                dropped_excluded,
            );
        }

        // Walk rootward from the MRCA; the deepest ancestor whose bitmask
        // still avoids the exclusion mask owns the stem edge.
        let mut deepest_valid = mrca;
        let mut current = self.tree[mrca].parent;
        while let Some(ancestor) = current {
            if !(&self.tree[ancestor].split & &exclusion_mask).is_zero() {
                break;
            }
            deepest_valid = ancestor;
            current = self.tree[ancestor].parent;
        }
        debug!(node = deepest_valid, "resolved branch-based target");
        MappingOutcome::success(
            AttachedElement::Edge(deepest_valid),
            dropped_included,
            dropped_excluded,
        )
    }

    /// Splits the given ids into taxa present in the tree (as index keys)
    /// and dropped ids, optionally running each through the expansion seam.
    pub(crate) fn taxa_in_tree(
        &self,
        ids: &[IdValue],
        expand: bool,
    ) -> (Vec<String>, Vec<IdValue>) {
        let mut found = Vec::new();
        let mut dropped = Vec::new();
        for id in ids {
            let expanded = if expand {
                self.expander.expand(id)
            } else {
                vec![id.clone()]
            };
            for expanded_id in expanded {
                let key = expanded_id.as_key();
                if self.taxa.contains(&key) {
                    found.push(key);
                } else {
                    dropped.push(expanded_id);
                }
            }
        }
        (found, dropped)
    }

    /// Union of the bits of taxa known to be present.
    pub(crate) fn union_mask(&self, labels: &[String]) -> BigUint {
        let mut mask = BigUint::default();
        for label in labels {
            if let Some(bit) = self.taxa.bit_of(label) {
                mask |= &bit;
            }
        }
        mask
    }

    /// MRCA of the given present taxa: the unique shallowest node whose edge
    /// bitmask covers all their bits. A single taxon resolves directly to
    /// its node, never invoking the general computation.
    fn mrca(&self, labels: &[String]) -> Option<NodeIndex> {
        let first = self.taxa.node_of(labels.first()?)?;
        if labels.len() == 1 {
            return Some(first);
        }
        let mask = self.union_mask(labels);
        let mut current = first;
        loop {
            if (&self.tree[current].split & &mask) == mask {
                return Some(current);
            }
            current = self.tree[current].parent?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::annotation::ReferenceTarget;
    use crate::encoding::splits::{encode_splits, SplitOptions};

    /// (((A,B),C),(D,E)) without internal taxa
    fn fixture() -> (Tree, TaxonIndex, SplitTable, [NodeIndex; 4]) {
        let mut tree = Tree::new();
        let root = tree.add_root();
        let g1 = tree.add_child(root);
        let ab = tree.add_child(g1);
        let a = tree.add_child(ab);
        let b = tree.add_child(ab);
        let c = tree.add_child(g1);
        let g2 = tree.add_child(root);
        let d = tree.add_child(g2);
        let e = tree.add_child(g2);
        tree[a].taxon = Some("A".to_string());
        tree[b].taxon = Some("B".to_string());
        tree[c].taxon = Some("C".to_string());
        tree[d].taxon = Some("D".to_string());
        tree[e].taxon = Some("E".to_string());
        let taxa = TaxonIndex::build(&tree).unwrap();
        let table = encode_splits(&mut tree, &taxa, &SplitOptions::default());
        (tree, taxa, table, [root, g1, ab, g2])
    }

    fn ids(values: &[&str]) -> Vec<IdValue> {
        values.iter().map(|v| IdValue::from(*v)).collect()
    }

    #[test]
    fn test_single_present_taxon_resolves_to_its_leaf() {
        let (tree, taxa, table, _) = fixture();
        let resolver = Resolver::new(&tree, &taxa, &table);
        let outcome = resolver.resolve_node_target(&ReferenceTarget::node(ids(&["A", "zzz"])));
        assert!(outcome.is_success());
        assert_eq!(
            outcome.attached_to,
            Some(AttachedElement::Node(taxa.node_of("A").unwrap()))
        );
        assert_eq!(outcome.dropped_included, ids(&["zzz"]));
    }

    #[test]
    fn test_no_included_taxa_in_tree_fails() {
        let (tree, taxa, table, _) = fixture();
        let resolver = Resolver::new(&tree, &taxa, &table);
        let outcome = resolver.resolve_node_target(&ReferenceTarget::node(ids(&["x", "y"])));
        assert_eq!(outcome.reason, Reason::NoIncludedInTree);
        assert_eq!(outcome.attached_to, None);
        assert_eq!(outcome.dropped_included.len(), 2);
    }

    #[test]
    fn test_empty_included_ids_always_fail() {
        let (tree, taxa, table, _) = fixture();
        let resolver = Resolver::new(&tree, &taxa, &table);
        let target = ReferenceTarget::branch(Vec::new(), ids(&["D"]));
        let outcome = resolver.resolve_branch_target(&target);
        assert_eq!(outcome.reason, Reason::NoIncludedInTree);
    }

    #[test]
    fn test_node_target_resolves_to_mrca() {
        let (tree, taxa, table, [_, g1, ab, _]) = fixture();
        let resolver = Resolver::new(&tree, &taxa, &table);
        let outcome = resolver.resolve_node_target(&ReferenceTarget::node(ids(&["A", "C"])));
        assert_eq!(outcome.attached_to, Some(AttachedElement::Node(g1)));
        let outcome = resolver.resolve_node_target(&ReferenceTarget::node(ids(&["A", "B"])));
        assert_eq!(outcome.attached_to, Some(AttachedElement::Node(ab)));
    }

    #[test]
    fn test_branch_target_without_present_exclusions_is_root_edge() {
        let (tree, taxa, table, [root, ..]) = fixture();
        let resolver = Resolver::new(&tree, &taxa, &table);
        let target = ReferenceTarget::branch(ids(&["A", "B"]), ids(&["missing"]));
        let outcome = resolver.resolve_branch_target(&target);
        assert!(outcome.is_success());
        assert_eq!(outcome.attached_to, Some(AttachedElement::Edge(root)));
        assert_eq!(outcome.dropped_excluded, ids(&["missing"]));
    }

    #[test]
    fn test_mrca_containing_excluded_taxon_fails() {
        let (tree, taxa, table, _) = fixture();
        let resolver = Resolver::new(&tree, &taxa, &table);
        // the MRCA of {A, C} contains B
        let target = ReferenceTarget::branch(ids(&["A", "C"]), ids(&["B"]));
        let outcome = resolver.resolve_branch_target(&target);
        assert_eq!(outcome.reason, Reason::MrcaHasExcluded);
        assert_eq!(outcome.attached_to, None);
    }

    #[test]
    fn test_stem_walk_stops_below_first_excluded_ancestor() {
        let (tree, taxa, table, [_, g1, ..]) = fixture();
        let resolver = Resolver::new(&tree, &taxa, &table);
        // MRCA of {A, B} is clean; its parent still avoids D; the root does not
        let target = ReferenceTarget::branch(ids(&["A", "B"]), ids(&["D"]));
        let outcome = resolver.resolve_branch_target(&target);
        assert!(outcome.is_success());
        assert_eq!(outcome.attached_to, Some(AttachedElement::Edge(g1)));
    }

    #[test]
    fn test_stem_walk_reaching_root_yields_root_edge() {
        let (tree, taxa, table, [root, ..]) = fixture();
        // exclude a taxon, then resolve a target whose exclusions are present
        // nowhere on the path: include {D, E}, exclude {C}: mrca g2, parent
        // root contains C -> stem stays at g2. To reach the root instead,
        // exclude nothing that exists above: include {A}, exclude {B}.
        let resolver = Resolver::new(&tree, &taxa, &table);
        let target = ReferenceTarget::branch(ids(&["A"]), ids(&["B"]));
        let outcome = resolver.resolve_branch_target(&target);
        // every ancestor of A contains B, so the stem stays at the leaf
        assert_eq!(
            outcome.attached_to,
            Some(AttachedElement::Edge(taxa.node_of("A").unwrap()))
        );
        // and with no excluded taxa present at all, the root edge wins
        let target = ReferenceTarget::branch(ids(&["A"]), Vec::new());
        let outcome = resolver.resolve_branch_target(&target);
        assert_eq!(outcome.attached_to, Some(AttachedElement::Edge(root)));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let (tree, taxa, table, _) = fixture();
        let resolver = Resolver::new(&tree, &taxa, &table);
        let target = ReferenceTarget::branch(ids(&["A", "B"]), ids(&["D", "zzz"]));
        let first = resolver.resolve(&target);
        let second = resolver.resolve(&target);
        assert_eq!(first, second);
    }

    struct DoublingExpander;

    impl TaxonExpander for DoublingExpander {
        fn expand(&self, id: &IdValue) -> Vec<IdValue> {
            // pretend every id is a higher-rank group covering two tips
            match id.as_key().as_str() {
                "AB" => vec![IdValue::from("A"), IdValue::from("B")],
                _ => vec![id.clone()],
            }
        }
    }

    #[test]
    fn test_expansion_seam_applies_to_included_ids() {
        let (tree, taxa, table, [_, _, ab, _]) = fixture();
        let resolver = Resolver::new(&tree, &taxa, &table).with_expander(DoublingExpander);
        let outcome = resolver.resolve_node_target(&ReferenceTarget::node(ids(&["AB"])));
        assert_eq!(outcome.attached_to, Some(AttachedElement::Node(ab)));
    }

    #[test]
    fn test_excluded_expansion_controlled_by_config() {
        let (tree, taxa, table, _) = fixture();
        let resolver = Resolver::new(&tree, &taxa, &table)
            .with_expander(DoublingExpander)
            .with_config(ResolveConfig {
                expand_excluded: false,
            });
        // unexpanded, "AB" is absent from the tree and gets dropped, so the
        // stem target falls back to the root edge
        let target = ReferenceTarget::branch(ids(&["C"]), ids(&["AB"]));
        let outcome = resolver.resolve_branch_target(&target);
        assert_eq!(outcome.dropped_excluded, ids(&["AB"]));
        assert_eq!(
            outcome.attached_to,
            Some(AttachedElement::Edge(tree.root_index()))
        );
    }
}
