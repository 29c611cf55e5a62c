//! Tunables for each pipeline stage.

use crate::Real;

/// Default weight of one polygon split against one unit of front/back imbalance.
pub const DEFAULT_SPLIT_WEIGHT: Real = 4.0;

/// Default half-size of the initial portal polygon built on every splitter.
pub const DEFAULT_PORTAL_EXTENT: Real = 65536.0;

/// BSP compiler settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompileConfig {
    /// Cost of one split, in units of front/back imbalance.
    pub split_weight: Real,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            split_weight: DEFAULT_SPLIT_WEIGHT,
        }
    }
}

impl CompileConfig {
    pub fn with_split_weight(mut self, split_weight: Real) -> Self {
        self.split_weight = split_weight;
        self
    }
}

/// Portal generator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortalConfig {
    /// Must exceed the scene bounds in every direction.
    pub extent: Real,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            extent: DEFAULT_PORTAL_EXTENT,
        }
    }
}

impl PortalConfig {
    pub fn with_extent(mut self, extent: Real) -> Self {
        self.extent = extent;
        self
    }
}

/// Visibility calculator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisConfig {
    /// Compute rows of the portal table on the rayon pool.
    /// Ignored without the `parallel` feature.
    pub parallel: bool,
}

impl Default for VisConfig {
    fn default() -> Self {
        Self {
            parallel: cfg!(feature = "parallel"),
        }
    }
}

impl VisConfig {
    pub fn sequential() -> Self {
        Self { parallel: false }
    }
}
