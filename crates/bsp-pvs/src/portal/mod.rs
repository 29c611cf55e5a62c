//! Portals: the planar openings between adjacent empty leaves.
//!
//! The generator is written against the [`TreeLike`] family of traits, so
//! the plain [`BspTree`](crate::bsp::BspTree) and the [`LayeredTree`]
//! variant share one clipping algorithm.

mod generator;
mod layered;
mod traits;

use nalgebra::Point3;

use crate::{Polygon, Real};

pub use generator::{generate_portals, PortalGenerator};
pub use layered::LayeredTree;
pub use traits::{BranchLike, LeafLike, NodeRef, PortalSide, TreeLike};

/// Payload carried by every portal polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortalInfo {
    /// Leaf behind the portal.
    pub from_leaf: usize,
    /// Leaf the portal's normal points into.
    pub to_leaf: usize,
    /// Position in the portal list; row/column of the portal vis table.
    pub index: usize,
}

/// A convex opening from `from_leaf` into `to_leaf`.
pub type Portal = Polygon<Point3<Real>, PortalInfo>;
