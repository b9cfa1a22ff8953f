//! Declarative post-hoc checks against a resolved target.
//!
//! Monophyly requires the clade's union bitmask to be an exact split of the
//! tree, not merely a subset of some larger clade; exclusion requires the
//! target edge's bitmask to avoid every bit of the named taxa.

use num_traits::Zero;

use crate::core::annotation::Condition;
use crate::core::types::AttachedElement;
use crate::resolve::engine::{Resolver, TaxonExpander};

impl<E: TaxonExpander> Resolver<'_, E> {
    /// Evaluates one condition against the resolved target. Returns `true`
    /// when the check passes.
    #[must_use]
    pub fn evaluate(&self, condition: &Condition, target: Option<AttachedElement>) -> bool {
        match condition {
            Condition::Monophyly(ids) => {
                let (found, _) = self.taxa_in_tree(ids, true);
                let clade_mask = self.union_mask(&found);
                !clade_mask.is_zero() && self.splits.contains(&clade_mask)
            }
            Condition::Exclusion(ids) => {
                // vacuously true without a resolvable target
                let Some(element) = target else { return true };
                let edge = element.edge_node();
                let (found, _) = self.taxa_in_tree(ids, self.config.expand_excluded);
                let clade_mask = self.union_mask(&found);
                (&self.tree[edge].split & &clade_mask).is_zero()
            }
        }
    }
}
