//! Axis-aligned building blocks for hand-made test levels.

use nalgebra::{Point3, Vector3};

use crate::{Polygon, Real};

/// A rectangle (quad) in 3D space, defined by a corner and two edge vectors.
///
/// The four vertices are:
/// - `origin`
/// - `origin + u`
/// - `origin + u + v`
/// - `origin + v`
///
/// The front side (normal) is `u × v`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    origin: Point3<Real>,
    u: Vector3<Real>,
    v: Vector3<Real>,
}

impl Rectangle {
    /// Creates a new rectangle from an origin corner and two edge vectors.
    pub fn new(origin: Point3<Real>, u: Vector3<Real>, v: Vector3<Real>) -> Self {
        Self { origin, u, v }
    }

    /// Returns the four vertices of the rectangle, counter-clockwise seen from the front.
    pub fn vertices(&self) -> [Point3<Real>; 4] {
        [
            self.origin,
            self.origin + self.u,
            self.origin + self.u + self.v,
            self.origin + self.v,
        ]
    }

    /// Converts into a polygon without payload.
    pub fn to_polygon(&self) -> Polygon {
        Polygon::from_vertices(self.vertices().to_vec())
    }
}

impl From<Rectangle> for Polygon {
    fn from(rectangle: Rectangle) -> Self {
        rectangle.to_polygon()
    }
}

/// The six walls of the box `min..max`, facing inwards.
///
/// Polygons face into open space, so this encloses an empty room.
/// Flip the polygons to get a solid block instead.
pub fn room(min: Point3<Real>, max: Point3<Real>) -> Vec<Polygon> {
    let dx = Vector3::new(max.x - min.x, 0.0, 0.0);
    let dy = Vector3::new(0.0, max.y - min.y, 0.0);
    let dz = Vector3::new(0.0, 0.0, max.z - min.z);

    vec![
        // floor (+y) and ceiling (-y)
        Rectangle::new(min, dz, dx),
        Rectangle::new(min + dy, dx, dz),
        // +x and -x walls
        Rectangle::new(min, dy, dz),
        Rectangle::new(min + dx, dz, dy),
        // +z and -z walls
        Rectangle::new(min, dx, dy),
        Rectangle::new(min + dz, dy, dx),
    ]
    .into_iter()
    .map(Polygon::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vertex;

    #[test]
    fn rectangle_winding_follows_u_cross_v() {
        let rect = Rectangle::new(Point3::origin(), Vector3::x(), Vector3::y());
        let poly = rect.to_polygon();
        assert_eq!(poly.len(), 4);
        assert!((poly.unit_normal().unwrap() - Vector3::z()).norm() < 1e-12);
        assert_eq!(poly.vertices()[2].position(), Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn room_walls_face_the_center() {
        let min = Point3::new(-1.0, 0.0, 2.0);
        let max = Point3::new(3.0, 2.0, 5.0);
        let center = Point3::from((min.coords + max.coords) * 0.5);
        let walls = room(min, max);
        assert_eq!(walls.len(), 6);
        for wall in &walls {
            let plane = wall.plane().unwrap();
            assert!(plane.signed_distance(center) > 0.0);
        }
        let area: Real = walls.iter().map(|w| w.area()).sum();
        assert!((area - 2.0 * (4.0 * 2.0 + 4.0 * 3.0 + 2.0 * 3.0)).abs() < 1e-9);
    }
}
