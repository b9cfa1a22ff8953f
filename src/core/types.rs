use serde::{Deserialize, Serialize};

use crate::core::tree::NodeIndex;

/// An annotation or taxon identifier as it appears in JSON: a string or an
/// integer. Round-trips without coercing one into the other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Int(i64),
    Str(String),
}

impl IdValue {
    /// The lookup key used against the taxon index.
    #[must_use]
    pub fn as_key(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for IdValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for IdValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<i64> for IdValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

/// Kind of tree position a phyloreference designates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// The MRCA node of the included taxa
    Node,
    /// The stem edge below the deepest ancestor still excluding the
    /// disallowed taxa
    Branch,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node => write!(f, "node"),
            Self::Branch => write!(f, "branch"),
        }
    }
}

/// Why a mapping attempt ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// A target was found and every error check passed
    Success,
    /// None of the included ids are present in the tree
    NoIncludedInTree,
    /// The include group is not cleanly separable from the exclude group
    MrcaHasExcluded,
    /// A declared hard condition failed after resolution
    ErrorCheckFailed,
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::ErrorCheckFailed => write!(f, "an error check failed"),
            Self::NoIncludedInTree => {
                write!(f, "no specifiers to be included were in the tree")
            }
            Self::MrcaHasExcluded => write!(
                f,
                "the include group is paraphyletic with respect to member/members of the exclude group"
            ),
        }
    }
}

/// A concrete tree element an annotation can bind to. Edges are addressed by
/// their head node: every node owns the stem edge leading down to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachedElement {
    Node(NodeIndex),
    Edge(NodeIndex),
}

impl AttachedElement {
    /// Index of the node whose stem edge carries this element's bitmask.
    /// For a node element that is the node itself.
    #[must_use]
    pub fn edge_node(&self) -> NodeIndex {
        match self {
            Self::Node(idx) | Self::Edge(idx) => *idx,
        }
    }

    #[must_use]
    pub fn is_edge(&self) -> bool {
        matches!(self, Self::Edge(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_value_roundtrip_int() {
        let id: IdValue = serde_json::from_str("42").unwrap();
        assert_eq!(id, IdValue::Int(42));
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
    }

    #[test]
    fn test_id_value_roundtrip_str() {
        let id: IdValue = serde_json::from_str("\"770319\"").unwrap();
        assert_eq!(id, IdValue::Str("770319".to_string()));
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"770319\"");
    }

    #[test]
    fn test_id_value_key() {
        assert_eq!(IdValue::Int(7).as_key(), "7");
        assert_eq!(IdValue::from("x").as_key(), "x");
    }

    #[test]
    fn test_target_kind_serde() {
        let kind: TargetKind = serde_json::from_str("\"branch\"").unwrap();
        assert_eq!(kind, TargetKind::Branch);
        assert_eq!(serde_json::to_string(&TargetKind::Node).unwrap(), "\"node\"");
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(Reason::Success.to_string(), "success");
        assert_eq!(
            Reason::NoIncludedInTree.to_string(),
            "no specifiers to be included were in the tree"
        );
    }

    #[test]
    fn test_attached_element_edge_node() {
        assert_eq!(AttachedElement::Node(3).edge_node(), 3);
        assert_eq!(AttachedElement::Edge(5).edge_node(), 5);
        assert!(AttachedElement::Edge(5).is_edge());
        assert!(!AttachedElement::Node(5).is_edge());
    }
}
