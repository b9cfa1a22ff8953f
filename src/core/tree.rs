//! Arena-based rooted tree model.
//!
//! Nodes are stored in a contiguous vector and referenced by [`NodeIndex`];
//! parent/child relations are indices into the arena, so the pointer-heavy
//! parent/back-reference shape of typical tree objects never produces
//! ownership cycles. Every node owns the stem edge leading down to it: the
//! edge's branch length, its split bitmask (assigned by the split encoder),
//! and the list of annotations bound to the edge. The root's stem edge is the
//! root edge whose bitmask covers every taxon in the tree.

use num_bigint::BigUint;

use crate::core::types::IdValue;

/// Index of a node in a tree arena.
pub type NodeIndex = usize;

/// A node record plus the stem edge leading to it.
#[derive(Debug, Clone)]
pub struct Node {
    /// Parent node, `None` for the root
    pub parent: Option<NodeIndex>,

    /// Child nodes in order; empty for leaves
    pub children: Vec<NodeIndex>,

    /// Taxon id carried by this node. Always present on labeled leaves;
    /// internal nodes carry one when the tree labels higher-rank groups.
    pub taxon: Option<String>,

    /// Non-taxon label, e.g. a synthetic output id assigned during reporting
    pub label: Option<String>,

    /// Branch length of the stem edge, when the source tree has lengths
    pub length: Option<f64>,

    /// Split bitmask of the stem edge: union of the bits of all taxa at or
    /// below this node. Zero until the split encoder runs.
    pub split: BigUint,

    /// Annotation ids bound to this node
    pub annotations: Vec<IdValue>,

    /// Annotation ids bound to this node's stem edge
    pub edge_annotations: Vec<IdValue>,

    removed: bool,
}

impl Node {
    fn new(parent: Option<NodeIndex>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            taxon: None,
            label: None,
            length: None,
            split: BigUint::default(),
            annotations: Vec::new(),
            edge_annotations: Vec::new(),
            removed: false,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

/// A rooted tree over an arena of [`Node`] records.
///
/// # Construction
///
/// Top-down: create the root with [`Tree::add_root`], then attach children
/// with [`Tree::add_child`] as they are parsed. Folded-away nodes stay in the
/// arena as tombstones but are unreachable from the root, so traversals never
/// visit them.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    root: Option<NodeIndex>,
    name: Option<String>,
    unrooted: bool,
}

impl Tree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a name to this tree, used to identify it in applied-to
    /// records and log output.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks this tree as unrooted. The split table built over an unrooted
    /// tree uses normalized keys so a split and its complement collide.
    #[must_use]
    pub fn with_unrooted(mut self, unrooted: bool) -> Self {
        self.unrooted = unrooted;
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn is_rooted(&self) -> bool {
        !self.unrooted
    }

    /// Adds the root node to an empty tree and returns its index.
    pub fn add_root(&mut self) -> NodeIndex {
        debug_assert!(self.root.is_none(), "tree already has a root");
        let index = self.nodes.len();
        self.nodes.push(Node::new(None));
        self.root = Some(index);
        index
    }

    /// Adds a child under `parent` and returns the new node's index.
    pub fn add_child(&mut self, parent: NodeIndex) -> NodeIndex {
        let index = self.nodes.len();
        self.nodes.push(Node::new(Some(parent)));
        self.nodes[parent].children.push(index);
        index
    }

    #[must_use]
    pub fn is_root_set(&self) -> bool {
        self.root.is_some()
    }

    /// Index of the root node.
    ///
    /// # Panics
    /// Panics if the tree has no root yet and thus is still under
    /// construction.
    #[must_use]
    pub fn root_index(&self) -> NodeIndex {
        self.root.expect("tree has no root set")
    }

    #[must_use]
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index]
    }

    pub fn node_mut(&mut self, index: NodeIndex) -> &mut Node {
        &mut self.nodes[index]
    }

    /// Number of arena slots, including tombstones left behind by folding.
    #[must_use]
    pub fn num_slots(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live leaf nodes.
    #[must_use]
    pub fn num_leaves(&self) -> usize {
        self.postorder().filter(|&i| self.nodes[i].is_leaf()).count()
    }

    /// Returns an iterator over live node indices in postorder (children
    /// before parents). This is the traversal order of the split encoder.
    #[must_use]
    pub fn postorder(&self) -> PostOrderIter<'_> {
        PostOrderIter::new(self)
    }

    /// Returns an iterator over live node indices in preorder (parents
    /// before children). This is the row order of the placement table.
    #[must_use]
    pub fn preorder(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }

    /// Collapses nodes with exactly one child into their parent, merging
    /// branch lengths additively where both are present. Runs to completion:
    /// chains of single-child nodes collapse fully. Must happen before split
    /// encoding so the split table only references surviving edges.
    pub fn fold_unary_nodes(&mut self) {
        let Some(root) = self.root else { return };

        // Root chain: the root absorbs a lone internal child.
        while self.nodes[root].children.len() == 1 {
            let child = self.nodes[root].children[0];
            if self.nodes[child].is_leaf() {
                break;
            }
            let child_length = self.nodes[child].length;
            self.nodes[root].length = merge_lengths(self.nodes[root].length, child_length);
            let grandchildren = std::mem::take(&mut self.nodes[child].children);
            for &gc in &grandchildren {
                self.nodes[gc].parent = Some(root);
            }
            self.nodes[root].children = grandchildren;
            self.nodes[child].removed = true;
            self.nodes[child].parent = None;
        }

        // Interior chains: splice each single-child node out of its parent's
        // child list, keeping the position so sibling order is stable.
        loop {
            let mut changed = false;
            for index in 0..self.nodes.len() {
                if self.nodes[index].removed || index == root {
                    continue;
                }
                if self.nodes[index].children.len() != 1 {
                    continue;
                }
                let Some(parent) = self.nodes[index].parent else {
                    continue;
                };
                let child = self.nodes[index].children[0];
                let own_length = self.nodes[index].length;
                self.nodes[child].length = merge_lengths(self.nodes[child].length, own_length);
                self.nodes[child].parent = Some(parent);
                if let Some(pos) = self.nodes[parent].children.iter().position(|&c| c == index) {
                    self.nodes[parent].children[pos] = child;
                }
                self.nodes[index].removed = true;
                self.nodes[index].children.clear();
                self.nodes[index].parent = None;
                changed = true;
            }
            if !changed {
                break;
            }
        }
    }
}

fn merge_lengths(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (a, None) => a,
        (None, b) => b,
    }
}

impl std::ops::Index<NodeIndex> for Tree {
    type Output = Node;

    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index]
    }
}

impl std::ops::IndexMut<NodeIndex> for Tree {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        &mut self.nodes[index]
    }
}

/// Stack-based postorder iterator over live node indices.
pub struct PostOrderIter<'a> {
    tree: &'a Tree,
    stack: Vec<(NodeIndex, bool)>, // (index, children_visited)
}

impl<'a> PostOrderIter<'a> {
    fn new(tree: &'a Tree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root {
            stack.push((root, false));
        }
        PostOrderIter { tree, stack }
    }
}

impl Iterator for PostOrderIter<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((index, children_visited)) = self.stack.pop() {
            let node = &self.tree.nodes[index];
            if children_visited || node.is_leaf() {
                return Some(index);
            }
            self.stack.push((index, true));
            for &child in node.children.iter().rev() {
                self.stack.push((child, false));
            }
        }
        None
    }
}

/// Stack-based preorder iterator over live node indices.
pub struct PreOrderIter<'a> {
    tree: &'a Tree,
    stack: Vec<NodeIndex>,
}

impl<'a> PreOrderIter<'a> {
    fn new(tree: &'a Tree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root {
            stack.push(root);
        }
        PreOrderIter { tree, stack }
    }
}

impl Iterator for PreOrderIter<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        for &child in self.tree.nodes[index].children.iter().rev() {
            self.stack.push(child);
        }
        Some(index)
    }
}
