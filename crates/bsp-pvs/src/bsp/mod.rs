//! Solid-leaf Binary Space Partitioning tree and its compiler.
//!
//! The compiler recursively partitions space using planes derived from the
//! input polygons until every cell is convex. Polygons face into open space,
//! so cells behind a wall are solid and cells in front of one are empty.
//! Empty leaves receive dense indices used by the portal and visibility
//! stages.
//!
//! # Example
//!
//! ```ignore
//! use bsp_pvs::bsp::build;
//! use bsp_pvs::shapes::room;
//! use nalgebra::Point3;
//!
//! let walls = room(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 3.0, 4.0));
//! let compiled = build(walls, vec![], 4.0)?;
//! assert_eq!(compiled.tree.empty_leaf_count(), 1);
//! ```
//!
//! # Architecture
//!
//! - [`BspTree`]: arena of nodes in post-order, with a leaf-index lookup
//! - [`BspNode`]: a [`Branch`] (splitter plane + children) or a [`Leaf`]
//! - [`PlaneSelector`]: strategy trait for choosing splitting planes
//! - [`BspCompiler`]: turns polygons (+ hints) into a tree and the final polygon array

mod compiler;
mod node;
mod selector;
mod tree;

pub use compiler::{build, BspCompiler, CompiledBsp};
pub use node::{Branch, BspNode, Leaf, LeafKind, NodeId};
pub use selector::{FirstCandidate, PlaneSelector, SplitEntry, WeightedSelector};
pub use tree::BspTree;
