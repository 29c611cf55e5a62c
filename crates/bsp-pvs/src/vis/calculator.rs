//! Three-phase portal visibility.
//!
//! 1. [`initial_portal_vis`] rules out portal pairs facing the wrong way.
//! 2. [`flood_fill`] drops pairs with no portal path between them.
//! 3. [`full_portal_vis`] clips chains of portals against antipenumbrae and
//!    marks the portals a sightline can actually reach.
//!
//! The portal table is then folded into a [`LeafVisTable`].

use log::{debug, info};

use crate::config::VisConfig;
use crate::portal::Portal;
use crate::{BspError, Classification, Cuttable, Plane3D, Result};

use super::antipenumbra::Antipenumbra;
use super::table::{LeafVisTable, PortalVis, VisTable};

/// Computes leaf visibility with the default [`VisConfig`].
pub fn calculate(empty_leaf_count: usize, portals: &[Portal]) -> Result<LeafVisTable> {
    VisCalculator::default().calculate(empty_leaf_count, portals)
}

/// Runs the whole visibility pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisCalculator {
    config: VisConfig,
}

impl VisCalculator {
    pub fn new(config: VisConfig) -> Self {
        Self { config }
    }

    /// Returns the leaf-by-leaf visibility of `portals`.
    ///
    /// Fails with [`BspError::Format`] if a portal references a leaf outside
    /// `0..empty_leaf_count` or its index differs from its position, and with
    /// [`BspError::Geometry`] if a portal is degenerate.
    pub fn calculate(&self, empty_leaf_count: usize, portals: &[Portal]) -> Result<LeafVisTable> {
        let graph = PortalGraph::new(empty_leaf_count, portals)?;
        info!(
            "Calculating visibility for {} leaves and {} portals",
            empty_leaf_count,
            portals.len()
        );

        let initial = initial_portal_vis(&graph, self.config.parallel)?;
        info!("Phase 1: {} possible pairs", count(&initial, PortalVis::Maybe));

        let flooded = flood_fill(&graph, &initial, self.config.parallel);
        info!("Phase 2: {} reachable pairs", count(&flooded, PortalVis::Maybe));

        let full = full_portal_vis(&graph, &initial, &flooded, self.config.parallel);
        info!("Phase 3: {} visible pairs", count(&full, PortalVis::Yes));

        let leaves = leaf_vis(&graph, &full)?;
        let visible: usize = (0..leaves.size()).map(|leaf| leaves.visible_count(leaf)).sum();
        info!(
            "Visibility done: {:.1} leaves visible on average",
            visible as f64 / leaves.size().max(1) as f64
        );
        Ok(leaves)
    }
}

/// Portals indexed for the calculation: planes, and the portals leaving
/// each leaf.
#[derive(Debug, Clone)]
pub struct PortalGraph<'a> {
    portals: &'a [Portal],
    planes: Vec<Plane3D>,
    leaving: Vec<Vec<usize>>,
}

impl<'a> PortalGraph<'a> {
    /// Validates `portals` against `empty_leaf_count` and indexes them.
    pub fn new(empty_leaf_count: usize, portals: &'a [Portal]) -> Result<Self> {
        let too_many =
            || BspError::Format(format!("{empty_leaf_count} empty leaves do not fit in memory"));
        empty_leaf_count
            .checked_mul(empty_leaf_count)
            .filter(|&cells| cells <= isize::MAX as usize)
            .ok_or_else(too_many)?;
        let mut leaving = Vec::new();
        leaving.try_reserve_exact(empty_leaf_count).map_err(|_| too_many())?;
        leaving.resize_with(empty_leaf_count, Vec::new);
        let mut planes = Vec::with_capacity(portals.len());

        for (position, portal) in portals.iter().enumerate() {
            let info = portal.aux();
            if info.index != position {
                return Err(BspError::Format(format!(
                    "portal {position} carries index {}",
                    info.index
                )));
            }
            for leaf in [info.from_leaf, info.to_leaf] {
                if leaf >= empty_leaf_count {
                    return Err(BspError::Format(format!(
                        "portal {position} references leaf {leaf} of {empty_leaf_count}"
                    )));
                }
            }
            if info.from_leaf == info.to_leaf {
                return Err(BspError::Format(format!(
                    "portal {position} links leaf {} to itself",
                    info.from_leaf
                )));
            }
            if portal.len() < 3 {
                return Err(BspError::Format(format!(
                    "portal {position} has {} vertices",
                    portal.len()
                )));
            }

            planes.push(portal.plane().map_err(|err| match err {
                BspError::Geometry(msg) => BspError::Geometry(format!("portal {position}: {msg}")),
                other => other,
            })?);
            leaving[info.from_leaf].push(position);
        }

        Ok(Self {
            portals,
            planes,
            leaving,
        })
    }

    #[inline]
    pub fn portals(&self) -> &'a [Portal] {
        self.portals
    }

    #[inline]
    pub fn portal_count(&self) -> usize {
        self.portals.len()
    }

    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaving.len()
    }

    #[inline]
    pub fn plane(&self, portal: usize) -> &Plane3D {
        &self.planes[portal]
    }

    /// Portals whose `from_leaf` is `leaf`.
    #[inline]
    pub fn leaving(&self, leaf: usize) -> &[usize] {
        &self.leaving[leaf]
    }

    /// Portals leaving the leaf `portal` opens into.
    #[inline]
    fn beyond(&self, portal: usize) -> &[usize] {
        self.leaving(self.portals[portal].aux().to_leaf)
    }
}

/// Phase 1: `(i, j)` is `No` when `j` is behind or on the plane of `i`, or
/// `i` lies entirely in front of `j`. Everything else is `Maybe`.
pub fn initial_portal_vis(graph: &PortalGraph<'_>, parallel: bool) -> Result<VisTable<PortalVis>> {
    let mut table = VisTable::new(graph.portal_count(), PortalVis::No)?;
    for_each_row(&mut table, parallel, |i, row| {
        let source = &graph.portals[i];
        for (j, cell) in row.iter_mut().enumerate() {
            if i == j {
                continue;
            }
            let target = &graph.portals[j];
            let behind = matches!(
                target.classify(graph.plane(i)),
                Classification::Back | Classification::Coplanar
            );
            let facing_away = source.classify(graph.plane(j)) == Classification::Front;
            if !behind && !facing_away {
                *cell = PortalVis::Maybe;
            }
        }
    });
    Ok(table)
}

/// Phase 2: keeps `(i, k)` only if `k` is reachable from `i` through a chain
/// of portals where every step, and every portal against `i`, is `Maybe`.
pub fn flood_fill(
    graph: &PortalGraph<'_>,
    initial: &VisTable<PortalVis>,
    parallel: bool,
) -> VisTable<PortalVis> {
    let mut table = initial.clone();
    for_each_row(&mut table, parallel, |i, row| {
        let mut reached = vec![false; row.len()];
        let mut stack = vec![i];
        while let Some(j) = stack.pop() {
            for &k in graph.beyond(j) {
                if reached[k] {
                    continue;
                }
                if *initial.get(i, k) == PortalVis::Maybe && *initial.get(j, k) == PortalVis::Maybe {
                    reached[k] = true;
                    stack.push(k);
                }
            }
        }
        for (cell, reached) in row.iter_mut().zip(reached) {
            if *cell == PortalVis::Maybe && !reached {
                *cell = PortalVis::No;
            }
        }
    });
    table
}

/// Phase 3 over every source portal. Rows are independent and run on the
/// rayon pool when `parallel` is set and the feature is enabled.
pub fn full_portal_vis(
    graph: &PortalGraph<'_>,
    initial: &VisTable<PortalVis>,
    flooded: &VisTable<PortalVis>,
    parallel: bool,
) -> VisTable<PortalVis> {
    let mut table = flooded.clone();
    for_each_row(&mut table, parallel, |source, row| {
        calculate_portal_pvs(graph, initial, source, row);
    });
    table
}

/// One step of a sightline: the source as seen through every portal so far,
/// and the part of the last portal still reachable from it.
struct Chain {
    source: Portal,
    target: Portal,
    /// Index of the portal `target` was clipped from.
    portal: usize,
    /// Leaves this chain has already passed through.
    trail: Vec<usize>,
}

/// Phase 3 for a single source portal.
///
/// `row` is the source's row of the flooded table. On return it holds only
/// `Yes` and `No`.
pub fn calculate_portal_pvs(
    graph: &PortalGraph<'_>,
    initial: &VisTable<PortalVis>,
    source: usize,
    row: &mut [PortalVis],
) {
    let portals = graph.portals;
    let origin = &portals[source];
    let mut stack: Vec<Chain> = Vec::new();

    for &t in graph.beyond(source) {
        if row[t] != PortalVis::Maybe {
            continue;
        }
        let Some(target) = portals[t].clip_to_front(graph.plane(source)) else {
            continue;
        };
        let Some(clipped) = origin.clip_to_back(graph.plane(t)) else {
            continue;
        };
        row[t] = PortalVis::Yes;
        stack.push(Chain {
            source: clipped,
            target,
            portal: t,
            trail: vec![
                origin.aux().from_leaf,
                origin.aux().to_leaf,
                portals[t].aux().to_leaf,
            ],
        });
    }

    let mut expanded = 0usize;
    while let Some(chain) = stack.pop() {
        expanded += 1;
        let volume = Antipenumbra::new(&chain.source, &chain.target);

        for &g in graph.beyond(chain.portal) {
            let to_leaf = portals[g].aux().to_leaf;
            if row[g] == PortalVis::No
                || *initial.get(chain.portal, g) == PortalVis::No
                || chain.trail.contains(&to_leaf)
            {
                continue;
            }
            let Some(generator) = volume.clip(&portals[g]) else {
                continue;
            };
            let reverse = Antipenumbra::new(&generator.flipped(), &chain.target.flipped());
            let Some(clipped) = reverse.clip(&chain.source) else {
                continue;
            };

            row[g] = PortalVis::Yes;
            let mut trail = chain.trail.clone();
            trail.push(to_leaf);
            stack.push(Chain {
                source: clipped,
                target: generator,
                portal: g,
                trail,
            });
        }
    }

    for cell in row.iter_mut() {
        if *cell == PortalVis::Maybe {
            *cell = PortalVis::No;
        }
    }
    debug!(
        "portal {source}: {} visible after {expanded} chains",
        row.iter().filter(|&&vis| vis == PortalVis::Yes).count()
    );
}

/// Folds the portal table into leaves: a leaf sees itself, its neighbours,
/// and the far side of every portal visible through its own portals.
pub fn leaf_vis(graph: &PortalGraph<'_>, portal_vis: &VisTable<PortalVis>) -> Result<LeafVisTable> {
    let mut table = LeafVisTable::new(graph.leaf_count(), false)?;
    for leaf in 0..graph.leaf_count() {
        table.set(leaf, leaf, true);
        for &p in graph.leaving(leaf) {
            table.set(leaf, graph.portals[p].aux().to_leaf, true);
            for (g, vis) in portal_vis.row(p).iter().enumerate() {
                if *vis == PortalVis::Yes {
                    table.set(leaf, graph.portals[g].aux().to_leaf, true);
                }
            }
        }
    }
    Ok(table)
}

fn count(table: &VisTable<PortalVis>, value: PortalVis) -> usize {
    table.rows().flatten().filter(|&&cell| cell == value).count()
}

/// Calls `f(row_index, row)` for every row, on the rayon pool if requested.
fn for_each_row<T, F>(table: &mut VisTable<T>, parallel: bool, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    let size = table.size();
    if size == 0 {
        return;
    }

    #[cfg(feature = "parallel")]
    if parallel {
        use rayon::prelude::*;
        table
            .cells_mut()
            .par_chunks_mut(size)
            .enumerate()
            .for_each(|(index, row)| f(index, row));
        return;
    }

    let _ = parallel;
    for (index, row) in table.cells_mut().chunks_mut(size).enumerate() {
        f(index, row);
    }
}
