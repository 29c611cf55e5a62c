//! BSP tree container.

use nalgebra::Point3;

use crate::{BspError, PlaneSide, Real, Result};

use super::node::{Branch, BspNode, Leaf, NodeId};

/// A solid-leaf Binary Space Partitioning tree.
///
/// The tree owns a flat arena of nodes stored in post-order (children before
/// their parent, root last). Every leaf is a convex cell; empty leaves carry
/// a dense `leaf_index` used as the row/column key of the visibility table.
///
/// Trees are produced by [`BspCompiler`](super::BspCompiler) or loaded with
/// [`format::read_tree`](crate::format::read_tree) and are never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct BspTree {
    nodes: Vec<BspNode>,
    /// Leaf index -> arena index of that empty leaf.
    leaves: Vec<NodeId>,
}

impl BspTree {
    /// Builds a tree from an arena in post-order.
    ///
    /// Parent links are recomputed from the branches. Fails with
    /// [`BspError::Format`] if a branch references a node that is not
    /// stored before it, a node has two parents, the root is not last, or the
    /// empty-leaf indices are not exactly `0..n`.
    pub fn from_nodes(mut nodes: Vec<BspNode>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(BspError::Format("tree has no nodes".into()));
        }

        let mut parents: Vec<Option<NodeId>> = vec![None; nodes.len()];
        for (id, node) in nodes.iter().enumerate() {
            if let BspNode::Branch(branch) = node {
                for child in [branch.front(), branch.back()] {
                    if child >= id {
                        return Err(BspError::Format(format!(
                            "branch {id} references child {child} that is not loaded before it"
                        )));
                    }
                    if let Some(other) = parents[child] {
                        return Err(BspError::Format(format!(
                            "node {child} has two parents ({other} and {id})"
                        )));
                    }
                    parents[child] = Some(id);
                }
            }
        }

        let root = nodes.len() - 1;
        if let Some(orphan) = (0..root).find(|&id| parents[id].is_none()) {
            return Err(BspError::Format(format!(
                "node {orphan} has no parent and is not the root"
            )));
        }

        let empty_count = nodes
            .iter()
            .filter(|node| matches!(node, BspNode::Leaf(leaf) if !leaf.is_solid()))
            .count();
        let mut leaves: Vec<Option<NodeId>> = vec![None; empty_count];
        for (id, node) in nodes.iter().enumerate() {
            let Some(leaf_index) = node.as_leaf().and_then(Leaf::leaf_index) else {
                continue;
            };
            let Some(slot) = leaves.get_mut(leaf_index) else {
                return Err(BspError::Format(format!(
                    "leaf index {leaf_index} is out of range for {empty_count} empty leaves"
                )));
            };
            if slot.is_some() {
                return Err(BspError::Format(format!(
                    "leaf index {leaf_index} is used twice"
                )));
            }
            *slot = Some(id);
        }

        for (node, parent) in nodes.iter_mut().zip(parents) {
            node.set_parent(parent);
        }

        Ok(Self {
            nodes,
            leaves: leaves.into_iter().flatten().collect(),
        })
    }

    /// Arena index of the root node.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.nodes.len() - 1
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &BspNode {
        &self.nodes[id]
    }

    /// All nodes in post-order.
    #[inline]
    pub fn nodes(&self) -> &[BspNode] {
        &self.nodes
    }

    /// Total number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree has at least its root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of empty (non-solid) leaves.
    #[inline]
    pub fn empty_leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Arena index of the empty leaf with the given leaf index.
    #[inline]
    pub fn leaf_node(&self, leaf_index: usize) -> Option<NodeId> {
        self.leaves.get(leaf_index).copied()
    }

    /// The empty leaf with the given leaf index.
    pub fn leaf(&self, leaf_index: usize) -> Option<&Leaf> {
        self.leaf_node(leaf_index)
            .and_then(|id| self.nodes[id].as_leaf())
    }

    /// Iterates over every branch with its arena index.
    pub fn branches(&self) -> impl Iterator<Item = (NodeId, &Branch)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, node)| node.as_branch().map(|branch| (id, branch)))
    }

    /// Iterates over every leaf (solid and empty) with its arena index.
    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, &Leaf)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, node)| node.as_leaf().map(|leaf| (id, leaf)))
    }

    /// Walks from `id` up to the root, yielding `(ancestor, child_on_path)`.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        let mut child = id;
        std::iter::from_fn(move || {
            let parent = self.nodes[child].parent()?;
            let step = (parent, child);
            child = parent;
            Some(step)
        })
    }

    /// Returns the maximum depth of the tree (1 for a lone leaf).
    pub fn depth(&self) -> usize {
        // Post-order: children are always computed before their parent.
        let mut depths = vec![0usize; self.nodes.len()];
        for (id, node) in self.nodes.iter().enumerate() {
            depths[id] = match node {
                BspNode::Leaf(_) => 1,
                BspNode::Branch(branch) => 1 + depths[branch.front()].max(depths[branch.back()]),
            };
        }
        depths[self.root()]
    }

    /// Returns the leaf containing `point`. Points on a splitter go to the front.
    pub fn locate(&self, point: Point3<Real>) -> NodeId {
        let mut id = self.root();
        while let BspNode::Branch(branch) = &self.nodes[id] {
            id = match branch.plane().classify_point(point) {
                PlaneSide::Front | PlaneSide::OnPlane => branch.front(),
                PlaneSide::Back => branch.back(),
            };
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Plane3D;
    use nalgebra::Vector3;

    fn plane_x(offset: Real) -> Plane3D {
        Plane3D::new(Vector3::x(), offset).unwrap()
    }

    /// x > 1: empty leaf 1, 0 < x < 1: empty leaf 0, x < 0: solid.
    fn slab_tree() -> BspTree {
        BspTree::from_nodes(vec![
            BspNode::Leaf(Leaf::empty(0, vec![0])),
            BspNode::Leaf(Leaf::solid()),
            BspNode::Branch(Branch::new(plane_x(0.0), 0, 1)),
            BspNode::Leaf(Leaf::empty(1, vec![])),
            BspNode::Branch(Branch::new(plane_x(1.0), 3, 2)),
        ])
        .unwrap()
    }

    #[test]
    fn from_nodes_links_parents_and_leaves() {
        let tree = slab_tree();
        assert_eq!(tree.root(), 4);
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.empty_leaf_count(), 2);
        assert_eq!(tree.leaf_node(0), Some(0));
        assert_eq!(tree.leaf_node(1), Some(3));
        assert_eq!(tree.node(0).parent(), Some(2));
        assert_eq!(tree.node(2).parent(), Some(4));
        assert_eq!(tree.node(4).parent(), None);
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.branches().count(), 2);
        assert_eq!(tree.leaves().count(), 3);
    }

    #[test]
    fn ancestors_walk_to_root() {
        let tree = slab_tree();
        let path: Vec<_> = tree.ancestors(1).collect();
        assert_eq!(path, vec![(2, 1), (4, 2)]);
        assert_eq!(tree.ancestors(4).count(), 0);
    }

    #[test]
    fn locate_points() {
        let tree = slab_tree();
        assert_eq!(tree.locate(Point3::new(2.0, 0.0, 0.0)), 3);
        assert_eq!(tree.locate(Point3::new(0.5, 0.0, 0.0)), 0);
        assert_eq!(tree.locate(Point3::new(-0.5, 0.0, 0.0)), 1);
    }

    #[test]
    fn rejects_forward_child_reference() {
        let err = BspTree::from_nodes(vec![
            BspNode::Branch(Branch::new(plane_x(0.0), 1, 2)),
            BspNode::Leaf(Leaf::solid()),
            BspNode::Leaf(Leaf::solid()),
        ])
        .unwrap_err();
        assert!(matches!(err, BspError::Format(_)));
    }

    #[test]
    fn rejects_shared_child_and_orphans() {
        let shared = BspTree::from_nodes(vec![
            BspNode::Leaf(Leaf::solid()),
            BspNode::Branch(Branch::new(plane_x(0.0), 0, 0)),
        ]);
        assert!(matches!(shared, Err(BspError::Format(_))));

        let orphan = BspTree::from_nodes(vec![
            BspNode::Leaf(Leaf::solid()),
            BspNode::Leaf(Leaf::empty(0, vec![])),
        ]);
        assert!(matches!(orphan, Err(BspError::Format(_))));
    }

    #[test]
    fn rejects_sparse_leaf_indices() {
        let err = BspTree::from_nodes(vec![
            BspNode::Leaf(Leaf::empty(0, vec![])),
            BspNode::Leaf(Leaf::empty(2, vec![])),
            BspNode::Branch(Branch::new(plane_x(0.0), 0, 1)),
        ]);
        assert!(matches!(err, Err(BspError::Format(_))));
    }
}
