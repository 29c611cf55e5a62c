//! Capability traits the portal generator is written against.
//!
//! Any tree shape that can expose its root, node links, splitters and leaf
//! contents can have portals generated for it. [`BspTree`] implements them
//! directly; [`LayeredTree`](super::LayeredTree) wraps it with an extra
//! acceptance rule.

use crate::bsp::{Branch, BspNode, BspTree, Leaf, NodeId};
use crate::Plane3D;

/// Which side of the originating splitter a portal fragment is being pushed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalSide {
    /// The front subtree: the leaf found there becomes `to_leaf`.
    Front,
    /// The back subtree: the leaf found there becomes `from_leaf`.
    Back,
}

/// A leaf cell as seen by the portal generator.
pub trait LeafLike {
    fn is_solid(&self) -> bool;

    /// Dense index of an empty leaf.
    fn leaf_index(&self) -> Option<usize>;
}

/// An interior node as seen by the portal generator.
pub trait BranchLike {
    fn splitter(&self) -> &Plane3D;
    fn front(&self) -> NodeId;
    fn back(&self) -> NodeId;
}

/// Borrowed view of one node.
#[derive(Debug)]
pub enum NodeRef<'a, B, L> {
    Branch(&'a B),
    Leaf(&'a L),
}

/// A tree the portal generator can walk.
pub trait TreeLike {
    type Branch: BranchLike;
    type Leaf: LeafLike;

    fn root(&self) -> NodeId;
    fn node(&self, id: NodeId) -> NodeRef<'_, Self::Branch, Self::Leaf>;
    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// Every branch, in a stable order.
    fn branch_ids(&self) -> impl Iterator<Item = NodeId> + '_;

    /// Decides whether a fragment reaching `leaf` survives, returning the
    /// leaf index it links to. Solid leaves always discard the fragment.
    fn clip_portal_to_leaf(&self, leaf: &Self::Leaf, side: PortalSide) -> Option<usize> {
        let _ = side;
        if leaf.is_solid() {
            None
        } else {
            leaf.leaf_index()
        }
    }

    /// Final say on a fragment that has found both of its leaves.
    fn accept_portal(&self, from_leaf: usize, to_leaf: usize) -> bool {
        let _ = (from_leaf, to_leaf);
        true
    }
}

impl LeafLike for Leaf {
    #[inline]
    fn is_solid(&self) -> bool {
        Leaf::is_solid(self)
    }

    #[inline]
    fn leaf_index(&self) -> Option<usize> {
        Leaf::leaf_index(self)
    }
}

impl BranchLike for Branch {
    #[inline]
    fn splitter(&self) -> &Plane3D {
        self.plane()
    }

    #[inline]
    fn front(&self) -> NodeId {
        Branch::front(self)
    }

    #[inline]
    fn back(&self) -> NodeId {
        Branch::back(self)
    }
}

impl TreeLike for BspTree {
    type Branch = Branch;
    type Leaf = Leaf;

    #[inline]
    fn root(&self) -> NodeId {
        BspTree::root(self)
    }

    fn node(&self, id: NodeId) -> NodeRef<'_, Branch, Leaf> {
        match BspTree::node(self, id) {
            BspNode::Branch(branch) => NodeRef::Branch(branch),
            BspNode::Leaf(leaf) => NodeRef::Leaf(leaf),
        }
    }

    #[inline]
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        BspTree::node(self, id).parent()
    }

    fn branch_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.branches().map(|(id, _)| id)
    }
}
