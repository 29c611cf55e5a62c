//! Generic convex polygon with an auxiliary payload.

use nalgebra::{Point3, Vector3};

use crate::plane::NORMAL_EPSILON;
use crate::{BspError, Classification, Plane3D, Real, Result, Vertex};

/// A convex polygon in 3D space, defined by an ordered list of vertices and
/// one auxiliary payload (material, surface flags, portal links...).
///
/// Vertices should be coplanar and in counter-clockwise winding order
/// when viewed from the front (the direction the normal points).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon<V = Point3<Real>, A = ()> {
    vertices: Vec<V>,
    aux: A,
}

impl<V: Vertex> Polygon<V, ()> {
    /// Creates a polygon without auxiliary data.
    pub fn from_vertices(vertices: Vec<V>) -> Self {
        Self::new(vertices, ())
    }
}

impl<V: Vertex, A> Polygon<V, A> {
    /// Creates a new polygon from a list of vertices and its payload.
    ///
    /// # Panics (debug builds only)
    /// Panics if fewer than 3 vertices are provided.
    pub fn new(vertices: Vec<V>, aux: A) -> Self {
        debug_assert!(
            vertices.len() >= 3,
            "Polygon must have at least 3 vertices"
        );
        Self { vertices, aux }
    }

    /// Returns the vertices of the polygon.
    #[inline]
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    /// Returns the auxiliary payload.
    #[inline]
    pub fn aux(&self) -> &A {
        &self.aux
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns true if the polygon has no vertices (always false for valid polygons).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterates over the vertex positions.
    pub fn positions(&self) -> impl Iterator<Item = Point3<Real>> + '_ {
        self.vertices.iter().map(Vertex::position)
    }

    /// Iterates over the edges as `(start, end)` position pairs.
    pub fn edges(&self) -> impl Iterator<Item = (Point3<Real>, Point3<Real>)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| {
            (
                self.vertices[i].position(),
                self.vertices[(i + 1) % n].position(),
            )
        })
    }

    /// Computes the (unnormalized) normal with Newell's method.
    ///
    /// Its length is twice the polygon's area, so it stays meaningful even
    /// when the first vertices happen to be collinear.
    pub fn normal(&self) -> Vector3<Real> {
        let mut normal = Vector3::zeros();
        for (a, b) in self.edges() {
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
        }
        normal
    }

    /// Computes the unit normal vector of the polygon.
    ///
    /// Returns `None` if the polygon has (near) zero area.
    pub fn unit_normal(&self) -> Option<Vector3<Real>> {
        let n = self.normal();
        let len = n.norm();
        if len > NORMAL_EPSILON {
            Some(n / len)
        } else {
            None
        }
    }

    /// Returns the plane that this polygon lies on.
    ///
    /// Fails with [`BspError::Geometry`] for a degenerate polygon.
    pub fn plane(&self) -> Result<Plane3D> {
        if self.vertices.len() < 3 {
            return Err(BspError::Geometry(format!(
                "polygon has only {} vertices",
                self.vertices.len()
            )));
        }
        let normal = self.unit_normal().ok_or_else(|| {
            BspError::Geometry(format!(
                "degenerate polygon near {:?}: zero-area normal",
                self.centroid()
            ))
        })?;
        Plane3D::from_point_and_normal(self.centroid(), normal)
    }

    /// Area of the polygon.
    pub fn area(&self) -> Real {
        self.normal().norm() * 0.5
    }

    /// Computes the centroid (average of the vertices) of the polygon.
    pub fn centroid(&self) -> Point3<Real> {
        let sum: Vector3<Real> = self.positions().map(|p| p.coords).sum();
        Point3::from(sum / self.vertices.len().max(1) as Real)
    }

    /// Classifies this polygon relative to a plane.
    ///
    /// Returns:
    /// - `Front` if no vertex is behind the plane (and not all are on it)
    /// - `Back` if no vertex is in front of the plane (and not all are on it)
    /// - `Coplanar` if all vertices lie on the plane
    /// - `Straddle` if vertices are on both sides
    pub fn classify(&self, plane: &Plane3D) -> Classification {
        Classification::from_sides(self.positions().map(|p| plane.classify_point(p)))
    }

    /// Returns the same polygon with reversed winding (flipped normal).
    pub fn flipped(&self) -> Self
    where
        A: Clone,
    {
        let mut vertices = self.vertices.clone();
        vertices.reverse();
        Self {
            vertices,
            aux: self.aux.clone(),
        }
    }

    /// Replaces the payload, keeping the vertices.
    pub fn with_aux<B>(self, aux: B) -> Polygon<V, B> {
        Polygon {
            vertices: self.vertices,
            aux,
        }
    }
}
