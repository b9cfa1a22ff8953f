//! Outcome of one (tree, annotation) mapping attempt.

use crate::core::annotation::Condition;
use crate::core::types::{AttachedElement, IdValue, Reason};

/// Created fresh per resolution attempt; only the failed-check lists are
/// appended to during the attempt, never after it returns.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingOutcome {
    /// The resolved element, `None` on failure
    pub attached_to: Option<AttachedElement>,

    pub reason: Reason,

    /// Included ids requested but absent from the tree; non-fatal
    pub dropped_included: Vec<IdValue>,

    /// Excluded ids requested but absent from the tree; non-fatal
    pub dropped_excluded: Vec<IdValue>,

    /// Hard conditions that failed (at most one: evaluation stops there)
    pub failed_error_checks: Vec<Condition>,

    /// Soft conditions that failed; all of them run
    pub failed_warning_checks: Vec<Condition>,
}

impl MappingOutcome {
    #[must_use]
    pub fn success(
        element: AttachedElement,
        dropped_included: Vec<IdValue>,
        dropped_excluded: Vec<IdValue>,
    ) -> Self {
        Self {
            attached_to: Some(element),
            reason: Reason::Success,
            dropped_included,
            dropped_excluded,
            failed_error_checks: Vec::new(),
            failed_warning_checks: Vec::new(),
        }
    }

    #[must_use]
    pub fn failure(
        reason: Reason,
        dropped_included: Vec<IdValue>,
        dropped_excluded: Vec<IdValue>,
    ) -> Self {
        Self {
            attached_to: None,
            reason,
            dropped_included,
            dropped_excluded,
            failed_error_checks: Vec::new(),
            failed_warning_checks: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.reason == Reason::Success
    }

    /// Records a hard-condition failure and flips the outcome to failed.
    pub fn record_failed_error_check(&mut self, check: Condition) {
        self.failed_error_checks.push(check);
        self.reason = Reason::ErrorCheckFailed;
    }

    pub fn record_failed_warning_check(&mut self, check: Condition) {
        self.failed_warning_checks.push(check);
    }

    /// Human-readable account of how the attempt ended.
    #[must_use]
    pub fn explain(&self) -> String {
        match self.reason {
            Reason::Success => match self.attached_to {
                Some(AttachedElement::Node(index)) => {
                    format!("successfully mapped to node {index}")
                }
                Some(AttachedElement::Edge(index)) => {
                    format!("successfully mapped to the stem edge of node {index}")
                }
                None => "successfully mapped".to_string(),
            },
            Reason::ErrorCheckFailed => match self.failed_error_checks.first() {
                Some(check) => format!("Error check ({check}) failed."),
                None => "Error check failed.".to_string(),
            },
            reason => format!("Attaching the annotation to the tree failed ({reason})"),
        }
    }
}
