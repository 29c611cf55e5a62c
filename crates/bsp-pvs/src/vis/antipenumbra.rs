//! Separating-plane volumes between two portals.

use log::trace;
use nalgebra::Point3;

use crate::{Classification, Cuttable, Plane3D, Polygon, Real, Vertex};

/// The convex region a sightline through `source` and then `target` can
/// reach beyond `target`, bounded by planes with the source behind them.
#[derive(Debug, Clone)]
pub struct Antipenumbra {
    planes: Vec<Plane3D>,
}

impl Antipenumbra {
    /// Builds the volume from `source` through `target`.
    ///
    /// Starts from the source's and target's own planes. The rest pass
    /// through an edge of one polygon and a vertex of the other and keep
    /// only those with the source behind and the target in front. Collinear
    /// triples are skipped.
    pub fn new<A>(source: &Polygon<Point3<Real>, A>, target: &Polygon<Point3<Real>, A>) -> Self {
        let mut planes: Vec<Plane3D> = [source.plane(), target.plane()]
            .into_iter()
            .flatten()
            .collect();

        let source_points: Vec<Point3<Real>> = source.positions().collect();
        let target_points: Vec<Point3<Real>> = target.positions().collect();

        add_separators(&source_points, &target_points, &source_points, &target_points, &mut planes);
        add_separators(&target_points, &source_points, &source_points, &target_points, &mut planes);

        trace!("antipenumbra with {} planes", planes.len());
        Self { planes }
    }

    pub fn planes(&self) -> &[Plane3D] {
        &self.planes
    }

    /// Clips `polygon` to the volume, keeping the parts in front of (or on)
    /// every plane. `None` if nothing survives.
    pub fn clip<V: Vertex, A: Clone>(&self, polygon: &Polygon<V, A>) -> Option<Polygon<V, A>> {
        let mut clipped = polygon.clone();
        for plane in &self.planes {
            clipped = clipped.clip_to_front(plane)?;
        }
        Some(clipped)
    }
}

/// Planes through every edge of `edges_of` and every vertex of `vertices_of`
/// that separate `source` (behind) from `target` (in front).
fn add_separators(
    edges_of: &[Point3<Real>],
    vertices_of: &[Point3<Real>],
    source: &[Point3<Real>],
    target: &[Point3<Real>],
    planes: &mut Vec<Plane3D>,
) {
    let n = edges_of.len();
    for i in 0..n {
        let (a, b) = (edges_of[i], edges_of[(i + 1) % n]);
        for &c in vertices_of {
            let Ok(plane) = Plane3D::from_three_points(a, b, c) else {
                continue;
            };
            let plane = match (classify(source, &plane), classify(target, &plane)) {
                (Classification::Back, Classification::Front) => plane,
                (Classification::Front, Classification::Back) => plane.flipped(),
                _ => continue,
            };
            if !planes.iter().any(|known| known.is_coincident(&plane) && known.faces_same_way(&plane)) {
                planes.push(plane);
            }
        }
    }
}

fn classify(points: &[Point3<Real>], plane: &Plane3D) -> Classification {
    Classification::from_sides(points.iter().map(|p| plane.classify_point(*p)))
}
