//! Plane selection strategies for BSP tree construction.
//!
//! The choice of splitting plane affects tree balance and the number of
//! polygon splits during construction. Both strategies here honour hint
//! polygons first and are deterministic for identical input.

use nalgebra::Point3;

use crate::{Classification, Plane3D, Real};

/// One polygon of the working set, as seen by a selector.
#[derive(Debug, Clone, Copy)]
pub struct SplitEntry<'a> {
    /// Plane of the polygon.
    pub plane: &'a Plane3D,
    /// Vertex positions of the polygon.
    pub positions: &'a [Point3<Real>],
    /// Drawn from the hint set; not output geometry.
    pub hint: bool,
    /// May still be chosen as a splitter.
    pub candidate: bool,
}

impl SplitEntry<'_> {
    /// Classifies this entry's polygon against `plane`.
    pub fn classify(&self, plane: &Plane3D) -> Classification {
        Classification::from_sides(self.positions.iter().map(|p| plane.classify_point(*p)))
    }
}

/// Strategy for selecting which polygon's plane to use for splitting.
pub trait PlaneSelector {
    /// Select the working-set entry whose plane splits this subset.
    ///
    /// Must return an entry with `candidate == true`, or `None` if there is
    /// no candidate.
    fn select(&self, entries: &[SplitEntry<'_>]) -> Option<usize>;
}

/// First hint, otherwise the first candidate in working-set order.
///
/// Cheapest possible strategy; produces unbalanced trees unless the input
/// order is already good.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCandidate;

impl PlaneSelector for FirstCandidate {
    fn select(&self, entries: &[SplitEntry<'_>]) -> Option<usize> {
        first_hint(entries).or_else(|| entries.iter().position(|e| e.candidate))
    }
}

/// First hint, otherwise the candidate with the lowest
/// `weight * splits + |front - back|`.
///
/// Straddling polygons count once on each side. Hint entries are ignored
/// when counting. Ties keep the earliest entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedSelector {
    weight: Real,
}

impl WeightedSelector {
    pub fn new(weight: Real) -> Self {
        Self { weight }
    }

    #[inline]
    pub fn weight(&self) -> Real {
        self.weight
    }

    /// Cost of splitting `entries` by the plane of `entries[index]`.
    pub fn cost(&self, entries: &[SplitEntry<'_>], index: usize) -> Real {
        let plane = entries[index].plane;
        let (mut front, mut back, mut splits) = (0usize, 0usize, 0usize);

        for (j, other) in entries.iter().enumerate() {
            if j == index || other.hint {
                continue;
            }
            match other.classify(plane) {
                Classification::Front => front += 1,
                Classification::Back => back += 1,
                Classification::Straddle => {
                    front += 1;
                    back += 1;
                    splits += 1;
                }
                Classification::Coplanar => {}
            }
        }

        self.weight * splits as Real + (front as Real - back as Real).abs()
    }
}

impl Default for WeightedSelector {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SPLIT_WEIGHT)
    }
}

impl PlaneSelector for WeightedSelector {
    fn select(&self, entries: &[SplitEntry<'_>]) -> Option<usize> {
        if let Some(hint) = first_hint(entries) {
            return Some(hint);
        }

        let mut best: Option<(Real, usize)> = None;
        for (index, _) in entries.iter().enumerate().filter(|(_, e)| e.candidate) {
            let cost = self.cost(entries, index);
            if best.is_none_or(|(best_cost, _)| cost < best_cost) {
                best = Some((cost, index));
            }
        }
        best.map(|(_, index)| index)
    }
}

fn first_hint(entries: &[SplitEntry<'_>]) -> Option<usize> {
    entries.iter().position(|e| e.hint && e.candidate)
}
