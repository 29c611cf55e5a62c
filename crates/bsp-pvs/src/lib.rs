//! Offline level compiler: solid-leaf BSP trees, the portals between their
//! empty leaves, and the potentially visible set computed from those portals.
//!
//! The stages form a strict pipeline:
//!
//! ```text
//! polygons -> bsp::build -> BspTree (+ polygons)
//!          -> portal::generate_portals -> portals
//!          -> vis::calculate -> LeafVisTable
//! ```

pub mod bsp;
pub mod config;
mod cuttable;
mod error;
pub mod format;
mod plane;
mod polygon;
pub mod portal;
pub mod shapes;
mod vertex;
pub mod vis;

/// Scalar type used for all geometry.
pub type Real = f64;

pub use bsp::{build, BspTree, LeafKind};
pub use config::{CompileConfig, PortalConfig, VisConfig};
pub use cuttable::Cuttable;
pub use error::{BspError, Result};
pub use plane::{Classification, Plane3D, PlaneSide, PLANE_EPSILON};
pub use polygon::Polygon;
pub use portal::{generate_portals, Portal, PortalInfo};
pub use vertex::{TexturedVertex, Vertex};
pub use vis::{calculate, LeafVisTable};
