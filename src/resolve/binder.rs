//! Binding resolved annotations onto tree elements.
//!
//! [`TreeAnnotator`] owns one fully prepared tree (labels normalized, unary
//! nodes folded, taxa indexed, splits encoded) and applies annotations to it.
//! An application walks a fixed state machine: resolution either fails
//! terminally or finds a target; error checks either fail terminally or pass;
//! only then is the annotation attached — to the element's annotation list
//! and, in reverse, to the annotation's applied-to list.

use tracing::{debug, info, warn};

use crate::core::annotation::{Annotation, AppliedTo};
use crate::core::taxon::{normalize_ott_labels, TaxonError, TaxonIndex};
use crate::core::tree::{NodeIndex, Tree};
use crate::core::types::{AttachedElement, IdValue};
use crate::encoding::splits::{encode_splits, SplitOptions, SplitTable};
use crate::resolve::engine::{ResolveConfig, Resolver};
use crate::resolve::outcome::MappingOutcome;

/// Configuration for one tree-processing context
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotatorConfig {
    /// Enforce the taxonomic-id label conventions and rewrite labels to bare
    /// ids; disabled, labels are used verbatim
    pub verbatim_labels: bool,

    pub split: SplitOptions,

    pub resolve: ResolveConfig,
}

/// One tree plus everything derived from it, ready to accept annotations.
#[derive(Debug)]
pub struct TreeAnnotator {
    tree: Tree,
    taxa: TaxonIndex,
    splits: SplitTable,
    config: AnnotatorConfig,
    num_tried: usize,
    num_bound: usize,
    unplaced: Vec<(IdValue, MappingOutcome)>,
    autogen_counter: usize,
}

impl TreeAnnotator {
    /// Prepares `tree` for annotation: normalizes labels (unless verbatim),
    /// folds unary nodes when configured, builds the taxon index, and
    /// encodes splits. This must complete before any annotation is applied;
    /// the derived structures are read-only afterwards.
    ///
    /// # Errors
    ///
    /// Returns a [`TaxonError`] for duplicate taxon labels or an ambiguous
    /// labeling convention; both abort the whole run for this tree.
    pub fn new(mut tree: Tree, config: AnnotatorConfig) -> Result<Self, TaxonError> {
        if !config.verbatim_labels {
            normalize_ott_labels(&mut tree)?;
        }
        if config.split.fold_single_child_nodes {
            tree.fold_unary_nodes();
        }
        let taxa = TaxonIndex::build(&tree)?;
        let splits = encode_splits(&mut tree, &taxa, &config.split);
        info!(
            taxa = taxa.len(),
            splits = splits.len(),
            tree = tree.name().unwrap_or("tree"),
            "encoded tree"
        );
        Ok(Self {
            tree,
            taxa,
            splits,
            config,
            num_tried: 0,
            num_bound: 0,
            unplaced: Vec::new(),
            autogen_counter: 0,
        })
    }

    /// Applies one annotation: resolve, check, attach. Returns the outcome
    /// in every case; failures are also recorded on the unplaced list.
    pub fn apply(&mut self, annotation: &mut Annotation) -> MappingOutcome {
        self.num_tried += 1;

        let resolver = Resolver::new(&self.tree, &self.taxa, &self.splits)
            .with_config(self.config.resolve);
        let mut outcome = resolver.resolve(&annotation.target);

        if !outcome.is_success() {
            debug!(id = %annotation.id, reason = %outcome.reason, "annotation not placed");
            self.unplaced.push((annotation.id.clone(), outcome.clone()));
            return outcome;
        }
        let Some(element) = outcome.attached_to else {
            // success always carries an element; treat anything else as unplaced
            self.unplaced.push((annotation.id.clone(), outcome.clone()));
            return outcome;
        };

        for check in &annotation.target.error_checks {
            if !resolver.evaluate(check, Some(element)) {
                outcome.record_failed_error_check(check.clone());
                self.unplaced.push((annotation.id.clone(), outcome.clone()));
                return outcome;
            }
        }
        for check in &annotation.target.warning_checks {
            if !resolver.evaluate(check, Some(element)) {
                warn!(id = %annotation.id, check = %check, "warning check failed");
                outcome.record_failed_warning_check(check.clone());
            }
        }
        drop(resolver);

        match element {
            AttachedElement::Node(index) => {
                self.tree[index].annotations.push(annotation.id.clone());
            }
            AttachedElement::Edge(index) => {
                self.tree[index].edge_annotations.push(annotation.id.clone());
            }
        }
        annotation.applied_to.push(AppliedTo {
            tree: self.tree_label(),
            element,
        });
        self.num_bound += 1;
        outcome
    }

    /// Applies a batch of annotations in order.
    pub fn apply_all(&mut self, annotations: &mut [Annotation]) -> Vec<MappingOutcome> {
        annotations.iter_mut().map(|a| self.apply(a)).collect()
    }

    /// Stable output id for a node: its taxon id, an existing label, or a
    /// freshly assigned `AUTOGENID<n>` that sticks for the rest of the run.
    pub fn node_out_id(&mut self, index: NodeIndex) -> String {
        if let Some(taxon) = &self.tree[index].taxon {
            return taxon.clone();
        }
        if let Some(label) = &self.tree[index].label {
            return label.clone();
        }
        let label = format!("AUTOGENID{}", self.autogen_counter);
        self.autogen_counter += 1;
        self.tree[index].label = Some(label.clone());
        label
    }

    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    #[must_use]
    pub fn taxa(&self) -> &TaxonIndex {
        &self.taxa
    }

    #[must_use]
    pub fn splits(&self) -> &SplitTable {
        &self.splits
    }

    /// Name used for this tree in applied-to records.
    #[must_use]
    pub fn tree_label(&self) -> String {
        self.tree.name().unwrap_or("tree").to_string()
    }

    #[must_use]
    pub fn num_tried(&self) -> usize {
        self.num_tried
    }

    #[must_use]
    pub fn num_bound(&self) -> usize {
        self.num_bound
    }

    /// Annotations that could not be placed, with their outcomes.
    #[must_use]
    pub fn unplaced(&self) -> &[(IdValue, MappingOutcome)] {
        &self.unplaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::annotation::{Condition, ProvEntity, ReferenceTarget};
    use crate::core::types::Reason;

    fn verbatim_config() -> AnnotatorConfig {
        AnnotatorConfig {
            verbatim_labels: true,
            ..AnnotatorConfig::default()
        }
    }

    /// ((A,B),C)
    fn small_tree() -> Tree {
        let mut tree = Tree::new();
        let root = tree.add_root();
        let ab = tree.add_child(root);
        let a = tree.add_child(ab);
        let b = tree.add_child(ab);
        let c = tree.add_child(root);
        tree[a].taxon = Some("A".to_string());
        tree[b].taxon = Some("B".to_string());
        tree[c].taxon = Some("C".to_string());
        tree.with_name("t0")
    }

    fn ids(values: &[&str]) -> Vec<IdValue> {
        values.iter().map(|v| IdValue::from(*v)).collect()
    }

    fn annotation(id: i64, target: ReferenceTarget) -> Annotation {
        Annotation {
            id: IdValue::Int(id),
            target,
            annotated_at: "2015-01-01T00:00:00Z".to_string(),
            annotated_by: ProvEntity::named("test"),
            body: serde_json::json!({}),
            applied_to: Vec::new(),
        }
    }

    #[test]
    fn test_successful_application_attaches_both_ways() {
        let mut annotator = TreeAnnotator::new(small_tree(), verbatim_config()).unwrap();
        let mut a = annotation(1, ReferenceTarget::node(ids(&["A", "B"])));
        let outcome = annotator.apply(&mut a);

        assert!(outcome.is_success());
        let Some(AttachedElement::Node(node)) = outcome.attached_to else {
            panic!("expected a node element");
        };
        assert_eq!(annotator.tree()[node].annotations, vec![IdValue::Int(1)]);
        assert_eq!(
            a.applied_to,
            vec![AppliedTo {
                tree: "t0".to_string(),
                element: AttachedElement::Node(node),
            }]
        );
        assert_eq!(annotator.num_tried(), 1);
        assert_eq!(annotator.num_bound(), 1);
        assert!(annotator.unplaced().is_empty());
    }

    #[test]
    fn test_resolution_failure_is_terminal() {
        let mut annotator = TreeAnnotator::new(small_tree(), verbatim_config()).unwrap();
        let mut a = annotation(2, ReferenceTarget::node(ids(&["nope"])));
        let outcome = annotator.apply(&mut a);

        assert_eq!(outcome.reason, Reason::NoIncludedInTree);
        assert!(a.applied_to.is_empty());
        assert_eq!(annotator.num_bound(), 0);
        assert_eq!(annotator.unplaced().len(), 1);
        assert_eq!(annotator.unplaced()[0].0, IdValue::Int(2));
    }

    #[test]
    fn test_failed_error_check_prevents_attachment() {
        let mut annotator = TreeAnnotator::new(small_tree(), verbatim_config()).unwrap();
        let mut target = ReferenceTarget::node(ids(&["A", "B"]));
        // {A, C} is not monophyletic in ((A,B),C)
        target
            .error_checks
            .push(Condition::Monophyly(ids(&["A", "C"])));
        // a second check that would pass must never run
        target
            .error_checks
            .push(Condition::Monophyly(ids(&["A", "B"])));
        let mut a = annotation(3, target);
        let outcome = annotator.apply(&mut a);

        assert_eq!(outcome.reason, Reason::ErrorCheckFailed);
        assert_eq!(outcome.failed_error_checks.len(), 1);
        assert!(a.applied_to.is_empty());
        assert_eq!(annotator.num_bound(), 0);
        assert_eq!(annotator.unplaced().len(), 1);
    }

    #[test]
    fn test_failed_warning_checks_accumulate_and_still_attach() {
        let mut annotator = TreeAnnotator::new(small_tree(), verbatim_config()).unwrap();
        let mut target = ReferenceTarget::node(ids(&["A", "B"]));
        target
            .warning_checks
            .push(Condition::Monophyly(ids(&["A", "C"])));
        target
            .warning_checks
            .push(Condition::Exclusion(ids(&["B"])));
        let mut a = annotation(4, target);
        let outcome = annotator.apply(&mut a);

        assert!(outcome.is_success());
        assert_eq!(outcome.failed_warning_checks.len(), 2);
        assert_eq!(a.applied_to.len(), 1);
        assert_eq!(annotator.num_bound(), 1);
    }

    #[test]
    fn test_edge_attachment_goes_to_edge_list() {
        let mut annotator = TreeAnnotator::new(small_tree(), verbatim_config()).unwrap();
        let mut a = annotation(5, ReferenceTarget::branch(ids(&["A", "B"]), ids(&["C"])));
        let outcome = annotator.apply(&mut a);

        let Some(AttachedElement::Edge(edge)) = outcome.attached_to else {
            panic!("expected an edge element");
        };
        assert_eq!(
            annotator.tree()[edge].edge_annotations,
            vec![IdValue::Int(5)]
        );
        assert!(annotator.tree()[edge].annotations.is_empty());
    }

    #[test]
    fn test_one_target_holds_many_annotations() {
        let mut annotator = TreeAnnotator::new(small_tree(), verbatim_config()).unwrap();
        let mut first = annotation(6, ReferenceTarget::node(ids(&["A", "B"])));
        let mut second = annotation(7, ReferenceTarget::node(ids(&["A", "B"])));
        annotator.apply(&mut first);
        annotator.apply(&mut second);

        let node = annotator.taxa().node_of("A").unwrap();
        let parent = annotator.tree()[node].parent.unwrap();
        assert_eq!(
            annotator.tree()[parent].annotations,
            vec![IdValue::Int(6), IdValue::Int(7)]
        );
    }

    #[test]
    fn test_autogen_ids_are_monotonic_and_sticky() {
        let mut annotator = TreeAnnotator::new(small_tree(), verbatim_config()).unwrap();
        let root = annotator.tree().root_index();
        let inner = annotator.tree()[root].children[0];

        assert_eq!(annotator.node_out_id(root), "AUTOGENID0");
        assert_eq!(annotator.node_out_id(inner), "AUTOGENID1");
        // asking again returns the stored label, not a fresh counter value
        assert_eq!(annotator.node_out_id(root), "AUTOGENID0");
        // taxon-bearing nodes keep their id
        let a = annotator.taxa().node_of("A").unwrap();
        assert_eq!(annotator.node_out_id(a), "A");
    }

    #[test]
    fn test_ambiguous_labels_abort_construction() {
        let mut tree = small_tree();
        let root = tree.root_index();
        let extra = tree.add_child(root);
        tree[extra].taxon = Some("Canis_lupus_ott1".to_string());
        let err = TreeAnnotator::new(tree, AnnotatorConfig::default()).unwrap_err();
        assert!(matches!(err, TaxonError::AmbiguousLabeling(_)));
    }
}
