//! A BSP tree whose empty leaves belong to one or more map layers.

use crate::bsp::{Branch, BspTree, Leaf, NodeId};
use crate::{BspError, Result};

use super::traits::{NodeRef, TreeLike};

/// Wraps a [`BspTree`] with a layer bitmask per empty leaf.
///
/// Portals are only generated between leaves that share at least one layer,
/// so separate layers never see into each other.
#[derive(Debug, Clone, Copy)]
pub struct LayeredTree<'a> {
    tree: &'a BspTree,
    layers: &'a [u32],
}

impl<'a> LayeredTree<'a> {
    /// `layers[i]` is the layer mask of empty leaf `i`.
    pub fn new(tree: &'a BspTree, layers: &'a [u32]) -> Result<Self> {
        if layers.len() != tree.empty_leaf_count() {
            return Err(BspError::Format(format!(
                "{} layer masks for {} empty leaves",
                layers.len(),
                tree.empty_leaf_count()
            )));
        }
        Ok(Self { tree, layers })
    }
}

impl TreeLike for LayeredTree<'_> {
    type Branch = Branch;
    type Leaf = Leaf;

    fn root(&self) -> NodeId {
        self.tree.root()
    }

    fn node(&self, id: NodeId) -> NodeRef<'_, Branch, Leaf> {
        TreeLike::node(self.tree, id)
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        TreeLike::parent(self.tree, id)
    }

    fn branch_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        TreeLike::branch_ids(self.tree)
    }

    fn accept_portal(&self, from_leaf: usize, to_leaf: usize) -> bool {
        self.layers[from_leaf] & self.layers[to_leaf] != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::build;
    use crate::portal::generate_portals;
    use crate::shapes::{room, Rectangle};
    use nalgebra::{Point3, Vector3};

    fn two_cubes() -> BspTree {
        let hint = Rectangle::new(Point3::new(1.0, 0.0, 0.0), Vector3::y(), Vector3::z()).to_polygon();
        build(room(Point3::origin(), Point3::new(2.0, 1.0, 1.0)), vec![hint], 4.0)
            .unwrap()
            .tree
    }

    #[test]
    fn mask_count_must_match_leaves() {
        let tree = two_cubes();
        assert!(matches!(
            LayeredTree::new(&tree, &[1]),
            Err(BspError::Format(_))
        ));
    }

    #[test]
    fn shared_layer_keeps_portals() {
        let tree = two_cubes();
        let layers = [0b011, 0b110];
        let layered = LayeredTree::new(&tree, &layers).unwrap();
        assert_eq!(generate_portals(&layered), generate_portals(&tree));
    }

    #[test]
    fn disjoint_layers_drop_portals() {
        let tree = two_cubes();
        let layers = [0b01, 0b10];
        let layered = LayeredTree::new(&tree, &layers).unwrap();
        assert!(generate_portals(&layered).is_empty());
    }
}
