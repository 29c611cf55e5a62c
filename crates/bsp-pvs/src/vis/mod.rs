//! Potentially visible sets computed from a portal list.
//!
//! Visibility is conservative: a leaf may be reported visible when no
//! sightline actually reaches it, but a reachable leaf is never hidden.

mod antipenumbra;
mod calculator;
mod table;

pub use antipenumbra::Antipenumbra;
pub use calculator::{
    calculate, calculate_portal_pvs, flood_fill, full_portal_vis, initial_portal_vis, leaf_vis,
    PortalGraph, VisCalculator,
};
pub use table::{LeafVisTable, PortalVis, VisTable};
