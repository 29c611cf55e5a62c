//! Polygon cutting/splitting operations.

use crate::{Classification, Plane3D, PlaneSide, Polygon, Vertex};

/// Trait for geometry that can be cut by a plane.
pub trait Cuttable: Sized + Clone {
    /// Classifies the geometry against the plane.
    fn classify(&self, plane: &Plane3D) -> Classification;

    /// Cuts the geometry by a plane.
    ///
    /// Returns `(front, back)` where:
    /// - `front`: `Some(piece)` containing the part on the front side of the plane
    /// - `back`: `Some(piece)` containing the part on the back side of the plane
    ///
    /// # Return values by classification
    ///
    /// - **Front**: `(Some(self), None)` - entire geometry is in front
    /// - **Back**: `(None, Some(self))` - entire geometry is behind
    /// - **Coplanar**: `(Some(self), None)` - treated as front
    /// - **Straddle**: `(Some(front_part), Some(back_part))` - split into two pieces
    fn cut(&self, plane: &Plane3D) -> (Option<Self>, Option<Self>);

    /// Keeps the part in front of (or on) the plane.
    fn clip_to_front(&self, plane: &Plane3D) -> Option<Self> {
        match self.classify(plane) {
            Classification::Front | Classification::Coplanar => Some(self.clone()),
            Classification::Back => None,
            Classification::Straddle => self.cut(plane).0,
        }
    }

    /// Keeps the part behind (or on) the plane.
    fn clip_to_back(&self, plane: &Plane3D) -> Option<Self> {
        match self.classify(plane) {
            Classification::Back | Classification::Coplanar => Some(self.clone()),
            Classification::Front => None,
            Classification::Straddle => self.cut(plane).1,
        }
    }
}

impl<V: Vertex, A: Clone> Cuttable for Polygon<V, A> {
    fn classify(&self, plane: &Plane3D) -> Classification {
        Polygon::classify(self, plane)
    }

    fn cut(&self, plane: &Plane3D) -> (Option<Self>, Option<Self>) {
        match Polygon::classify(self, plane) {
            Classification::Front | Classification::Coplanar => (Some(self.clone()), None),
            Classification::Back => (None, Some(self.clone())),
            Classification::Straddle => split_polygon(self, plane),
        }
    }
}

/// Splits a straddling polygon into front and back parts.
///
/// Uses a variant of the Sutherland-Hodgman algorithm:
/// walks the polygon edges and builds two vertex lists,
/// adding intersection points when edges cross the plane.
fn split_polygon<V: Vertex, A: Clone>(
    polygon: &Polygon<V, A>,
    plane: &Plane3D,
) -> (Option<Polygon<V, A>>, Option<Polygon<V, A>>) {
    let vertices = polygon.vertices();
    let n = vertices.len();

    let mut front_verts = Vec::with_capacity(n + 1);
    let mut back_verts = Vec::with_capacity(n + 1);

    let distances: Vec<_> = vertices
        .iter()
        .map(|v| plane.signed_distance(v.position()))
        .collect();
    let sides: Vec<PlaneSide> = vertices
        .iter()
        .map(|v| plane.classify_point(v.position()))
        .collect();

    for i in 0..n {
        let j = (i + 1) % n;
        let current = &vertices[i];

        match sides[i] {
            PlaneSide::Front => front_verts.push(current.clone()),
            PlaneSide::Back => back_verts.push(current.clone()),
            PlaneSide::OnPlane => {
                // On-plane vertices go to both sides
                front_verts.push(current.clone());
                back_verts.push(current.clone());
            }
        }

        let crosses = matches!(
            (sides[i], sides[j]),
            (PlaneSide::Front, PlaneSide::Back) | (PlaneSide::Back, PlaneSide::Front)
        );

        if crosses {
            let t = distances[i] / (distances[i] - distances[j]);
            let intersection = current.interpolate(&vertices[j], t);
            front_verts.push(intersection.clone());
            back_verts.push(intersection);
        }
    }

    // Build result polygons (only if they have enough vertices)
    let front = (front_verts.len() >= 3).then(|| Polygon::new(front_verts, polygon.aux().clone()));
    let back = (back_verts.len() >= 3).then(|| Polygon::new(back_verts, polygon.aux().clone()));

    (front, back)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Real;
    use nalgebra::{Point3, Vector3};

    fn quad(points: [[Real; 3]; 4]) -> Polygon<Point3<Real>, u32> {
        Polygon::new(
            points.iter().map(|p| Point3::new(p[0], p[1], p[2])).collect(),
            42,
        )
    }

    #[test]
    fn cut_front_back_and_coplanar() {
        let poly = quad([
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ]);
        let below = Plane3D::new(Vector3::z(), 0.0).unwrap();
        let (front, back) = poly.cut(&below);
        assert_eq!(front.as_ref(), Some(&poly));
        assert!(back.is_none());

        let (front, back) = poly.cut(&below.flipped());
        assert!(front.is_none());
        assert_eq!(back.as_ref(), Some(&poly));

        let on = Plane3D::new(Vector3::z(), 1.0).unwrap();
        let (front, back) = poly.cut(&on);
        assert_eq!(front.as_ref(), Some(&poly));
        assert!(back.is_none());
    }

    #[test]
    fn split_round_trip_preserves_area_and_plane() {
        let poly = quad([
            [-1.0, -1.0, 0.3],
            [2.0, -1.0, 0.1],
            [2.0, 3.0, 0.5],
            [-1.0, 3.0, 0.7],
        ]);
        let original_plane = poly.plane().unwrap();
        let splitter = Plane3D::new(Vector3::new(1.0, 0.5, 0.0), 0.4).unwrap();
        assert_eq!(poly.classify(&splitter), Classification::Straddle);

        let (front, back) = poly.cut(&splitter);
        let front = front.unwrap();
        let back = back.unwrap();

        assert!((front.area() + back.area() - poly.area()).abs() < 1e-9);
        for piece in [&front, &back] {
            assert_eq!(*piece.aux(), 42);
            assert_eq!(piece.classify(&original_plane), Classification::Coplanar);
        }
        assert_eq!(front.classify(&splitter), Classification::Front);
        assert_eq!(back.classify(&splitter), Classification::Back);
    }

    #[test]
    fn split_through_vertices_shares_them() {
        // Diagonal cut through two opposite corners.
        let poly = quad([
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ]);
        let diagonal = Plane3D::new(Vector3::new(1.0, -1.0, 0.0), 0.0).unwrap();
        let (front, back) = poly.cut(&diagonal);
        let front = front.unwrap();
        let back = back.unwrap();
        assert_eq!(front.len(), 3);
        assert_eq!(back.len(), 3);
        assert!((front.area() - 0.5).abs() < 1e-12);
        assert!((back.area() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn clip_to_sides() {
        let poly = quad([
            [0.0, 0.0, 0.0],
            [4.0, 0.0, 0.0],
            [4.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ]);
        let x1 = Plane3D::new(Vector3::x(), 1.0).unwrap();
        let front = poly.clip_to_front(&x1).unwrap();
        let back = poly.clip_to_back(&x1).unwrap();
        assert!((front.area() - 3.0).abs() < 1e-12);
        assert!((back.area() - 1.0).abs() < 1e-12);

        let x5 = Plane3D::new(Vector3::x(), 5.0).unwrap();
        assert!(poly.clip_to_front(&x5).is_none());
        assert!(poly.clip_to_back(&x5).is_some());
    }
}
