//! Whole-pipeline scenarios: polygons in, leaf visibility out.

use bsp_pvs::bsp::{build, BspTree};
use bsp_pvs::portal::{generate_portals, Portal};
use bsp_pvs::shapes::{room, Rectangle};
use bsp_pvs::vis::{
    calculate, flood_fill, full_portal_vis, initial_portal_vis, LeafVisTable, PortalGraph,
    PortalVis, VisCalculator,
};
use bsp_pvs::{Classification, PlaneSide, Polygon, Real, VisConfig};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn p(x: Real, y: Real, z: Real) -> Point3<Real> {
    Point3::new(x, y, z)
}

/// Inward-facing walls of the box `min..max`. `west`/`east` open the
/// `x = min.x`/`x = max.x` wall over a band of y (full height in z).
fn cell(
    min: Point3<Real>,
    max: Point3<Real>,
    west: Option<(Real, Real)>,
    east: Option<(Real, Real)>,
) -> Vec<Polygon> {
    let dx = Vector3::new(max.x - min.x, 0.0, 0.0);
    let dy = Vector3::new(0.0, max.y - min.y, 0.0);
    let dz = Vector3::new(0.0, 0.0, max.z - min.z);

    let mut walls = vec![
        Rectangle::new(min, dz, dx),
        Rectangle::new(min + dy, dx, dz),
        Rectangle::new(min, dx, dy),
        Rectangle::new(min + dz, dy, dx),
    ];

    let bands = |opening: Option<(Real, Real)>| -> Vec<(Real, Real)> {
        match opening {
            None => vec![(min.y, max.y)],
            Some((y0, y1)) => [(min.y, y0), (y1, max.y)]
                .into_iter()
                .filter(|(a, b)| b - a > 1e-9)
                .collect(),
        }
    };
    for (a, b) in bands(west) {
        walls.push(Rectangle::new(p(min.x, a, min.z), Vector3::new(0.0, b - a, 0.0), dz));
    }
    for (a, b) in bands(east) {
        walls.push(Rectangle::new(p(max.x, a, min.z), dz, Vector3::new(0.0, b - a, 0.0)));
    }

    walls.into_iter().map(Polygon::from).collect()
}

const HIGH: (Real, Real) = (0.7, 1.0);
const LOW: (Real, Real) = (0.0, 0.3);

/// Four unit rooms along +x, 0.2 apart, joined by short tunnels through
/// high, low and high windows, plus a sealed room off to the side.
struct Chain {
    tree: BspTree,
    portals: Vec<Portal>,
    /// Boxes of empty space, rooms then tunnels.
    spaces: Vec<(Point3<Real>, Point3<Real>)>,
}

const ROOM_STRIDE: Real = 1.2;
const SEALED_ROOM_X: Real = 6.0;

fn room_min_x(room: usize) -> Real {
    room as Real * ROOM_STRIDE
}

fn room_center(room: usize) -> Point3<Real> {
    p(room_min_x(room) + 0.5, 0.5, 0.5)
}

fn chain() -> Chain {
    let windows = [HIGH, LOW, HIGH];
    let mut polygons = Vec::new();
    let mut spaces = Vec::new();

    for room in 0..4 {
        let x = room_min_x(room);
        let west = room.checked_sub(1).map(|w| windows[w]);
        let east = windows.get(room).copied();
        polygons.extend(cell(p(x, 0.0, 0.0), p(x + 1.0, 1.0, 1.0), west, east));
        spaces.push((p(x, 0.0, 0.0), p(x + 1.0, 1.0, 1.0)));
    }
    for (index, &(y0, y1)) in windows.iter().enumerate() {
        let x = room_min_x(index) + 1.0;
        let min = p(x, y0, 0.0);
        let max = p(x + ROOM_STRIDE - 1.0, y1, 1.0);
        polygons.extend(cell(min, max, Some((y0, y1)), Some((y0, y1))));
        spaces.push((min, max));
    }
    polygons.extend(room(p(SEALED_ROOM_X, 0.0, 0.0), p(SEALED_ROOM_X + 1.0, 1.0, 1.0)));

    let tree = build(polygons, vec![], 4.0).unwrap().tree;
    let portals = generate_portals(&tree);
    Chain {
        tree,
        portals,
        spaces,
    }
}

fn leaf_at(tree: &BspTree, point: Point3<Real>) -> Option<usize> {
    tree.node(tree.locate(point)).as_leaf()?.leaf_index()
}

/// Portals lie on a splitter inside that splitter's own cell, and on no other.
fn assert_portals_on_one_splitter(tree: &BspTree, portals: &[Portal]) {
    for portal in portals {
        let plane = portal.plane().unwrap();
        let centroid = portal.centroid();
        let owners = tree
            .branches()
            .filter(|(_, branch)| branch.plane().is_coincident(&plane))
            .filter(|&(id, _)| {
                tree.ancestors(id).all(|(ancestor, child)| {
                    let branch = tree.node(ancestor).as_branch().unwrap();
                    match branch.plane().classify_point(centroid) {
                        PlaneSide::OnPlane => true,
                        PlaneSide::Front => child == branch.front(),
                        PlaneSide::Back => child == branch.back(),
                    }
                })
            })
            .count();
        assert_eq!(owners, 1, "portal {:?}", portal.aux());

        for leaf in [portal.aux().from_leaf, portal.aux().to_leaf] {
            assert!(!tree.leaf(leaf).unwrap().is_solid());
        }
    }
}

/// A point inside `min..max`, kept a small margin away from the walls.
fn point_in(rng: &mut StdRng, (min, max): (Point3<Real>, Point3<Real>)) -> Point3<Real> {
    let margin = 0.02;
    let mut coord = |a: Real, b: Real| rng.gen_range(a + margin..b - margin);
    p(coord(min.x, max.x), coord(min.y, max.y), coord(min.z, max.z))
}

/// True if the segment and four copies shifted by `clearance` in y and z
/// only pass through empty leaves.
fn clear_line_of_sight(tree: &BspTree, a: Point3<Real>, b: Point3<Real>, clearance: Real) -> bool {
    let shifts = [
        Vector3::zeros(),
        Vector3::new(0.0, clearance, 0.0),
        Vector3::new(0.0, -clearance, 0.0),
        Vector3::new(0.0, 0.0, clearance),
        Vector3::new(0.0, 0.0, -clearance),
    ];
    let steps = ((b - a).norm() / 0.004).ceil() as usize + 1;
    shifts.iter().all(|shift| {
        (0..=steps).all(|step| {
            let t = step as Real / steps as Real;
            leaf_at(tree, a + (b - a) * t + shift).is_some()
        })
    })
}

#[test]
fn two_cubes_through_one_doorway_see_each_other() {
    let hint = Rectangle::new(p(1.0, 0.0, 0.0), Vector3::y(), Vector3::z()).to_polygon();
    let compiled = build(room(p(0.0, 0.0, 0.0), p(2.0, 1.0, 1.0)), vec![hint], 4.0).unwrap();
    let tree = &compiled.tree;
    assert_eq!(tree.empty_leaf_count(), 2);

    let portals = generate_portals(tree);
    assert_eq!(portals.len(), 2);
    assert_portals_on_one_splitter(tree, &portals);

    let vis = calculate(tree.empty_leaf_count(), &portals).unwrap();
    let a = leaf_at(tree, p(0.5, 0.5, 0.5)).unwrap();
    let b = leaf_at(tree, p(1.5, 0.5, 0.5)).unwrap();
    assert_ne!(a, b);
    for (from, to) in [(a, a), (b, b), (a, b), (b, a)] {
        assert!(vis.is_visible(from, to));
    }
}

#[test]
fn chain_portals_connect_empty_leaves() {
    let chain = chain();
    assert!(!chain.portals.is_empty());
    assert_eq!(chain.portals.len() % 2, 0);
    assert_portals_on_one_splitter(&chain.tree, &chain.portals);

    for space in &chain.spaces {
        let center = nalgebra::center(&space.0, &space.1);
        assert!(leaf_at(&chain.tree, center).is_some(), "{center:?} is solid");
    }
    assert!(leaf_at(&chain.tree, p(1.1, 0.5, 0.5)).is_none());
    assert!(leaf_at(&chain.tree, p(-0.5, 0.5, 0.5)).is_none());
    assert!(leaf_at(&chain.tree, p(0.5, 1.5, 0.5)).is_none());
}

#[test]
fn offset_windows_hide_the_last_room() {
    let chain = chain();
    let vis = calculate(chain.tree.empty_leaf_count(), &chain.portals).unwrap();
    let leaf = |room| leaf_at(&chain.tree, room_center(room)).unwrap();

    assert!(!vis.is_visible(leaf(0), leaf(3)));
    assert!(!vis.is_visible(leaf(3), leaf(0)));

    // High in room 0, down through both windows, low in room 2.
    let (a, b) = (p(0.8, 0.896, 0.5), p(2.6, 0.104, 0.5));
    assert!(clear_line_of_sight(&chain.tree, a, b, 0.01));
    let (la, lb) = (leaf_at(&chain.tree, a).unwrap(), leaf_at(&chain.tree, b).unwrap());
    assert!(vis.is_visible(la, lb));
    assert!(vis.is_visible(lb, la));
}

#[test]
fn sealed_room_is_never_visible() {
    let chain = chain();
    let vis = calculate(chain.tree.empty_leaf_count(), &chain.portals).unwrap();
    let sealed = leaf_at(&chain.tree, p(SEALED_ROOM_X + 0.5, 0.5, 0.5)).unwrap();

    for room in 0..4 {
        let other = leaf_at(&chain.tree, room_center(room)).unwrap();
        assert!(!vis.is_visible(other, sealed));
        assert!(!vis.is_visible(sealed, other));
    }
    assert!(vis.is_visible(sealed, sealed));
}

#[test]
fn no_false_negatives_against_sampled_sightlines() {
    let chain = chain();
    let vis = calculate(chain.tree.empty_leaf_count(), &chain.portals).unwrap();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut checked = 0;

    for _ in 0..400 {
        let from = chain.spaces[rng.gen_range(0..chain.spaces.len())];
        let to = chain.spaces[rng.gen_range(0..chain.spaces.len())];
        let (a, b) = (point_in(&mut rng, from), point_in(&mut rng, to));
        if !clear_line_of_sight(&chain.tree, a, b, 0.01) {
            continue;
        }
        let (la, lb) = (leaf_at(&chain.tree, a).unwrap(), leaf_at(&chain.tree, b).unwrap());
        assert!(vis.is_visible(la, lb), "{a:?} sees {b:?} but leaf {la} misses {lb}");
        checked += 1;
    }
    assert!(checked > 40, "only {checked} clear sightlines sampled");
}

#[test]
fn full_vis_never_exceeds_flood_fill() {
    let chain = chain();
    let graph = PortalGraph::new(chain.tree.empty_leaf_count(), &chain.portals).unwrap();
    let initial = initial_portal_vis(&graph, false).unwrap();
    let flooded = flood_fill(&graph, &initial, false);
    let full = full_portal_vis(&graph, &initial, &flooded, false);

    for i in 0..graph.portal_count() {
        for j in 0..graph.portal_count() {
            match *full.get(i, j) {
                PortalVis::Yes => assert_eq!(*flooded.get(i, j), PortalVis::Maybe),
                PortalVis::Maybe => panic!("({i}, {j}) left undecided"),
                PortalVis::No => {}
            }
            if *flooded.get(i, j) == PortalVis::Maybe {
                assert_eq!(*initial.get(i, j), PortalVis::Maybe);
            }
        }
    }
}

#[test]
fn parallel_rows_match_sequential() {
    let chain = chain();
    let count = chain.tree.empty_leaf_count();
    let sequential: LeafVisTable = VisCalculator::new(VisConfig::sequential())
        .calculate(count, &chain.portals)
        .unwrap();
    let parallel = VisCalculator::new(VisConfig { parallel: true })
        .calculate(count, &chain.portals)
        .unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn compilation_is_deterministic() {
    let first = chain();
    let second = chain();
    assert_eq!(first.tree, second.tree);
    assert_eq!(first.portals, second.portals);
}

#[test]
fn leaf_polygons_stay_in_their_cells() {
    let polygons = chain_polygons_for_cells();
    let compiled = build(polygons, vec![], 4.0).unwrap();
    let tree = &compiled.tree;
    for (id, leaf) in tree.leaves() {
        for &index in leaf.polygons() {
            let polygon = &compiled.polygons[index];
            for (ancestor, child) in tree.ancestors(id) {
                let branch = tree.node(ancestor).as_branch().unwrap();
                let class = polygon.classify(branch.plane());
                let expected = if child == branch.front() {
                    Classification::Front
                } else {
                    Classification::Back
                };
                assert!(class == expected || class == Classification::Coplanar);
            }
        }
    }
}

fn chain_polygons_for_cells() -> Vec<Polygon> {
    let mut polygons = cell(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0), None, Some(HIGH));
    polygons.extend(cell(p(1.0, 0.7, 0.0), p(1.2, 1.0, 1.0), Some(HIGH), Some(HIGH)));
    polygons.extend(cell(p(1.2, 0.0, 0.0), p(2.2, 1.0, 1.0), Some(HIGH), None));
    polygons
}
