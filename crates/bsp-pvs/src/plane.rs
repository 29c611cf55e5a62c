//! Plane representation and classification.

use nalgebra::{Point3, Vector3};

use crate::{BspError, Real, Result};

/// Default epsilon for plane classification.
/// Points within this distance of the plane are considered "on" the plane.
pub const PLANE_EPSILON: Real = 1e-5;

/// Normals shorter than this are treated as degenerate.
pub(crate) const NORMAL_EPSILON: Real = 1e-12;

/// Which side of a plane a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Point is in front of the plane (positive side of normal)
    Front,
    /// Point is behind the plane (negative side of normal)
    Back,
    /// Point lies on the plane (within epsilon tolerance)
    OnPlane,
}

/// Classification of a polygon or segment relative to a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No vertex is behind the plane and at least one is in front
    Front,
    /// No vertex is in front of the plane and at least one is behind
    Back,
    /// All vertices are on the plane
    Coplanar,
    /// Vertices are on both sides
    Straddle,
}

impl Classification {
    /// Folds per-vertex sides into a single classification.
    pub fn from_sides(sides: impl IntoIterator<Item = PlaneSide>) -> Self {
        let mut front = false;
        let mut back = false;
        for side in sides {
            match side {
                PlaneSide::Front => front = true,
                PlaneSide::Back => back = true,
                PlaneSide::OnPlane => {}
            }
        }
        match (front, back) {
            (false, false) => Classification::Coplanar,
            (true, false) => Classification::Front,
            (false, true) => Classification::Back,
            (true, true) => Classification::Straddle,
        }
    }
}

/// A plane in 3D space, represented as `normal · point = offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane3D {
    normal: Vector3<Real>,
    offset: Real,
}

impl Plane3D {
    /// Creates a new plane from a normal vector and offset.
    /// The normal (and offset) are rescaled so the normal has unit length.
    ///
    /// Fails with [`BspError::Geometry`] if the normal has zero length.
    pub fn new(normal: Vector3<Real>, offset: Real) -> Result<Self> {
        let norm = normal.norm();
        if !(norm > NORMAL_EPSILON) {
            return Err(BspError::Geometry(format!(
                "plane normal {normal:?} has zero length"
            )));
        }
        Ok(Self {
            normal: normal / norm,
            offset: offset / norm,
        })
    }

    /// Creates a plane from a point on the plane and a normal vector.
    pub fn from_point_and_normal(point: Point3<Real>, normal: Vector3<Real>) -> Result<Self> {
        let norm = normal.norm();
        if !(norm > NORMAL_EPSILON) {
            return Err(BspError::Geometry(format!(
                "plane through {point:?} has a zero-length normal"
            )));
        }
        let unit_normal = normal / norm;
        let offset = unit_normal.dot(&point.coords);
        Ok(Self {
            normal: unit_normal,
            offset,
        })
    }

    /// Creates a plane from three non-collinear points.
    /// The normal direction follows the right-hand rule: (b - a) × (c - a).
    pub fn from_three_points(a: Point3<Real>, b: Point3<Real>, c: Point3<Real>) -> Result<Self> {
        let normal = (b - a).cross(&(c - a));
        Self::from_point_and_normal(a, normal)
    }

    /// Returns the unit normal vector of the plane.
    #[inline]
    pub fn normal(&self) -> Vector3<Real> {
        self.normal
    }

    /// Returns the signed distance from the origin to the plane along the normal.
    #[inline]
    pub fn offset(&self) -> Real {
        self.offset
    }

    /// Computes the signed distance from a point to the plane.
    /// - Positive: point is in front (same side as normal)
    /// - Negative: point is behind (opposite side from normal)
    /// - Zero: point is on the plane
    #[inline]
    pub fn signed_distance(&self, point: Point3<Real>) -> Real {
        self.normal.dot(&point.coords) - self.offset
    }

    /// Side of the plane `point` lies on, within [`PLANE_EPSILON`].
    pub fn classify_point(&self, point: Point3<Real>) -> PlaneSide {
        match self.signed_distance(point) {
            d if d > PLANE_EPSILON => PlaneSide::Front,
            d if d < -PLANE_EPSILON => PlaneSide::Back,
            _ => PlaneSide::OnPlane,
        }
    }

    /// Returns a new plane with the normal flipped (facing the opposite direction).
    #[inline]
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            offset: -self.offset,
        }
    }

    /// Returns `true` if both planes describe the same surface, in either orientation.
    pub fn is_coincident(&self, other: &Plane3D) -> bool {
        let dot = self.normal.dot(&other.normal);
        if (dot.abs() - 1.0).abs() > PLANE_EPSILON {
            return false;
        }
        (self.offset - other.offset * dot.signum()).abs() <= PLANE_EPSILON
    }

    /// Returns `true` if the normals point into the same half-space.
    #[inline]
    pub fn faces_same_way(&self, other: &Plane3D) -> bool {
        self.normal.dot(&other.normal) > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_normal_and_offset() {
        let plane = Plane3D::new(Vector3::new(0.0, 2.0, 0.0), 4.0).unwrap();
        assert!((plane.normal() - Vector3::y()).norm() < 1e-12);
        assert!((plane.offset() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_normal_is_geometry_error() {
        let err = Plane3D::new(Vector3::zeros(), 1.0).unwrap_err();
        assert!(matches!(err, BspError::Geometry(_)));

        let p = Point3::new(1.0, 1.0, 1.0);
        assert!(Plane3D::from_three_points(p, p, Point3::origin()).is_err());
    }

    #[test]
    fn classify_points() {
        let plane = Plane3D::new(Vector3::z(), 1.0).unwrap();
        assert_eq!(plane.classify_point(Point3::new(0.0, 0.0, 2.0)), PlaneSide::Front);
        assert_eq!(plane.classify_point(Point3::new(5.0, 3.0, 0.0)), PlaneSide::Back);
        assert_eq!(
            plane.classify_point(Point3::new(7.0, -2.0, 1.0 + PLANE_EPSILON / 2.0)),
            PlaneSide::OnPlane
        );
    }

    #[test]
    fn sides_combine_into_classification() {
        use PlaneSide::{Back, Front, OnPlane};
        assert_eq!(Classification::from_sides([Front, Front]), Classification::Front);
        assert_eq!(Classification::from_sides([OnPlane, Front]), Classification::Front);
        assert_eq!(Classification::from_sides([Back, OnPlane]), Classification::Back);
        assert_eq!(Classification::from_sides([OnPlane, OnPlane]), Classification::Coplanar);
        assert_eq!(Classification::from_sides([Back, Front]), Classification::Straddle);
    }

    #[test]
    fn coincident_planes_ignore_orientation() {
        let plane = Plane3D::new(Vector3::new(1.0, 1.0, 0.0), 3.0).unwrap();
        assert!(plane.is_coincident(&plane.flipped()));
        assert!(!plane.faces_same_way(&plane.flipped()));

        let shifted = Plane3D::new(Vector3::new(1.0, 1.0, 0.0), 3.5).unwrap();
        assert!(!plane.is_coincident(&shifted));
    }
}
