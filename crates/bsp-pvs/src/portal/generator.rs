//! Portal generation by clipping splitter-sized polygons through the tree.

use log::{debug, info};
use nalgebra::{Point3, Vector3};

use crate::bsp::NodeId;
use crate::config::PortalConfig;
use crate::{Classification, Cuttable, Plane3D, Polygon, Real};

use super::traits::{BranchLike, NodeRef, PortalSide, TreeLike};
use super::{Portal, PortalInfo};

/// Generates portals with the default [`PortalConfig`].
pub fn generate_portals<T: TreeLike>(tree: &T) -> Vec<Portal> {
    PortalGenerator::default().generate(tree)
}

/// Finds the planar openings between adjacent empty leaves.
#[derive(Debug, Clone, Default)]
pub struct PortalGenerator {
    config: PortalConfig,
}

impl PortalGenerator {
    pub fn new(config: PortalConfig) -> Self {
        Self { config }
    }

    /// Returns every portal of `tree`.
    ///
    /// Each opening is emitted twice: once with its normal pointing into
    /// `to_leaf`, then reversed. `PortalInfo::index` is the position in the
    /// returned list.
    pub fn generate<T: TreeLike>(&self, tree: &T) -> Vec<Portal> {
        let mut portals = Vec::new();
        let mut branches = 0usize;

        for id in tree.branch_ids() {
            branches += 1;
            let before = portals.len();
            self.portals_for_branch(tree, id, &mut portals);
            if portals.len() > before {
                debug!("branch {id}: {} portals", portals.len() - before);
            }
        }

        info!(
            "Generated {} portals ({} openings) from {} branches",
            portals.len(),
            portals.len() / 2,
            branches
        );
        portals
    }

    fn portals_for_branch<T: TreeLike>(&self, tree: &T, id: NodeId, out: &mut Vec<Portal>) {
        let NodeRef::Branch(branch) = tree.node(id) else {
            return;
        };
        let plane = branch.splitter();
        let Some(fragment) = self.clip_to_ancestors(tree, id, plane) else {
            return;
        };

        let mut front_pieces = Vec::new();
        descend(tree, branch.front(), fragment, PortalSide::Front, plane, &mut front_pieces);

        for (piece, to_leaf) in front_pieces {
            let mut back_pieces = Vec::new();
            descend(tree, branch.back(), piece, PortalSide::Back, plane, &mut back_pieces);

            for (piece, from_leaf) in back_pieces {
                // A portal cannot link a leaf to itself.
                if from_leaf == to_leaf || !tree.accept_portal(from_leaf, to_leaf) {
                    continue;
                }
                if piece.unit_normal().is_none() {
                    continue;
                }
                let index = out.len();
                let reverse = piece.flipped();
                out.push(piece.with_aux(PortalInfo {
                    from_leaf,
                    to_leaf,
                    index,
                }));
                out.push(reverse.with_aux(PortalInfo {
                    from_leaf: to_leaf,
                    to_leaf: from_leaf,
                    index: index + 1,
                }));
            }
        }
    }

    /// Builds the maximal polygon on `plane` and trims it to the cell of
    /// branch `id`, clipping from the root down.
    ///
    /// Returns `None` if nothing is left, or if an ancestor shares the plane
    /// (that ancestor owns this boundary).
    fn clip_to_ancestors<T: TreeLike>(&self, tree: &T, id: NodeId, plane: &Plane3D) -> Option<Polygon> {
        let mut path = vec![id];
        while let Some(parent) = tree.parent(path[path.len() - 1]) {
            path.push(parent);
        }

        let mut node = tree.root();
        if path.pop() != Some(node) {
            return None;
        }
        let mut fragment = square_on_plane(plane, self.config.extent);
        while let Some(child) = path.pop() {
            let NodeRef::Branch(ancestor) = tree.node(node) else {
                return None;
            };
            let splitter = ancestor.splitter();
            fragment = match fragment.classify(splitter) {
                Classification::Coplanar => return None,
                _ if child == ancestor.front() => fragment.clip_to_front(splitter)?,
                _ => fragment.clip_to_back(splitter)?,
            };
            node = child;
        }
        Some(fragment)
    }
}

/// Pushes `fragment` down the subtree at `node`, collecting the pieces that
/// survive at leaves together with the leaf index each one reached.
fn descend<T: TreeLike>(
    tree: &T,
    node: NodeId,
    fragment: Polygon,
    side: PortalSide,
    origin: &Plane3D,
    out: &mut Vec<(Polygon, usize)>,
) {
    match tree.node(node) {
        NodeRef::Branch(branch) => {
            let splitter = branch.splitter();
            match fragment.classify(splitter) {
                Classification::Front => descend(tree, branch.front(), fragment, side, origin, out),
                Classification::Back => descend(tree, branch.back(), fragment, side, origin, out),
                Classification::Straddle => {
                    let (front, back) = fragment.cut(splitter);
                    if let Some(front) = front {
                        descend(tree, branch.front(), front, side, origin, out);
                    }
                    if let Some(back) = back {
                        descend(tree, branch.back(), back, side, origin, out);
                    }
                }
                Classification::Coplanar => {
                    // Another splitter on the same plane: stay on our side of it.
                    let towards_front = splitter.faces_same_way(origin) == (side == PortalSide::Front);
                    let next = if towards_front { branch.front() } else { branch.back() };
                    descend(tree, next, fragment, side, origin, out);
                }
            }
        }
        NodeRef::Leaf(leaf) => {
            if let Some(leaf_index) = tree.clip_portal_to_leaf(leaf, side) {
                out.push((fragment, leaf_index));
            }
        }
    }
}

/// A square of half-size `extent` lying on `plane`, wound so its normal
/// matches the plane normal, centred on the point of the plane closest to
/// the origin.
pub(crate) fn square_on_plane(plane: &Plane3D, extent: Real) -> Polygon {
    let normal = plane.normal();
    let center = Point3::from(normal * plane.offset());

    // Cross with the axis least aligned with the normal.
    let abs = normal.abs();
    let axis = if abs.x <= abs.y && abs.x <= abs.z {
        Vector3::x()
    } else if abs.y <= abs.z {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let u = normal.cross(&axis).normalize() * extent;
    let v = normal.cross(&u);

    Polygon::from_vertices(vec![
        center - u - v,
        center + u - v,
        center + u + v,
        center - u + v,
    ])
}
