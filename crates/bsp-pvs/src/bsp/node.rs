//! BSP tree node types.
//!
//! Nodes live in a flat arena owned by [`BspTree`](super::BspTree) and refer
//! to each other by index, so the parent back-reference never competes with
//! child ownership.

use crate::Plane3D;

/// Index of a node inside the tree arena.
pub type NodeId = usize;

/// A node in the BSP tree: either a splitting branch or a convex leaf cell.
#[derive(Debug, Clone, PartialEq)]
pub enum BspNode {
    Branch(Branch),
    Leaf(Leaf),
}

impl BspNode {
    /// Returns the parent node, `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        match self {
            BspNode::Branch(branch) => branch.parent,
            BspNode::Leaf(leaf) => leaf.parent,
        }
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        match self {
            BspNode::Branch(branch) => branch.parent = parent,
            BspNode::Leaf(leaf) => leaf.parent = parent,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, BspNode::Leaf(_))
    }

    #[inline]
    pub fn as_branch(&self) -> Option<&Branch> {
        match self {
            BspNode::Branch(branch) => Some(branch),
            BspNode::Leaf(_) => None,
        }
    }

    #[inline]
    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            BspNode::Leaf(leaf) => Some(leaf),
            BspNode::Branch(_) => None,
        }
    }
}

/// An interior node: a splitter plane with a front (left) and back (right) child.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    plane: Plane3D,
    front: NodeId,
    back: NodeId,
    parent: Option<NodeId>,
}

impl Branch {
    /// Creates an unparented branch.
    pub fn new(plane: Plane3D, front: NodeId, back: NodeId) -> Self {
        Self {
            plane,
            front,
            back,
            parent: None,
        }
    }

    /// Returns a reference to the splitting plane.
    #[inline]
    pub fn plane(&self) -> &Plane3D {
        &self.plane
    }

    /// Child on the front (positive) side of the plane.
    #[inline]
    pub fn front(&self) -> NodeId {
        self.front
    }

    /// Child on the back (negative) side of the plane.
    #[inline]
    pub fn back(&self) -> NodeId {
        self.back
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// What a leaf cell contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafKind {
    /// Inside the world geometry.
    Solid,
    /// Open space. `leaf_index` is the dense visibility key; `polygons`
    /// index the compiled polygon array.
    Empty {
        leaf_index: usize,
        polygons: Vec<usize>,
    },
}

/// A convex cell at the bottom of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    kind: LeafKind,
    parent: Option<NodeId>,
}

impl Leaf {
    pub fn solid() -> Self {
        Self {
            kind: LeafKind::Solid,
            parent: None,
        }
    }

    pub fn empty(leaf_index: usize, polygons: Vec<usize>) -> Self {
        Self {
            kind: LeafKind::Empty {
                leaf_index,
                polygons,
            },
            parent: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> &LeafKind {
        &self.kind
    }

    #[inline]
    pub fn is_solid(&self) -> bool {
        matches!(self.kind, LeafKind::Solid)
    }

    /// Dense index of an empty leaf, `None` for solid leaves.
    #[inline]
    pub fn leaf_index(&self) -> Option<usize> {
        match self.kind {
            LeafKind::Empty { leaf_index, .. } => Some(leaf_index),
            LeafKind::Solid => None,
        }
    }

    /// Indices of the polygons inside this cell (always empty for solid leaves).
    #[inline]
    pub fn polygons(&self) -> &[usize] {
        match &self.kind {
            LeafKind::Empty { polygons, .. } => polygons,
            LeafKind::Solid => &[],
        }
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}
