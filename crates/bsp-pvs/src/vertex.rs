//! Vertex types that can be carried through polygon splits.

use nalgebra::{Point3, Vector2};

use crate::Real;

/// A polygon vertex: something with a position that can be interpolated
/// along an edge when a polygon is cut.
pub trait Vertex: Clone {
    /// Position of the vertex in world space.
    fn position(&self) -> Point3<Real>;

    /// Returns the vertex at parameter `t` along the edge `self -> other`.
    fn interpolate(&self, other: &Self, t: Real) -> Self;
}

impl Vertex for Point3<Real> {
    #[inline]
    fn position(&self) -> Point3<Real> {
        *self
    }

    #[inline]
    fn interpolate(&self, other: &Self, t: Real) -> Self {
        self + (other - self) * t
    }
}

/// A render vertex: position plus texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexturedVertex {
    pub position: Point3<Real>,
    pub uv: Vector2<Real>,
}

impl TexturedVertex {
    pub fn new(position: Point3<Real>, uv: Vector2<Real>) -> Self {
        Self { position, uv }
    }
}

impl Vertex for TexturedVertex {
    #[inline]
    fn position(&self) -> Point3<Real> {
        self.position
    }

    fn interpolate(&self, other: &Self, t: Real) -> Self {
        Self {
            position: self.position.interpolate(&other.position, t),
            uv: self.uv.lerp(&other.uv, t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textured_vertex_interpolates_uv() {
        let a = TexturedVertex::new(Point3::new(0.0, 0.0, 0.0), Vector2::new(0.0, 0.0));
        let b = TexturedVertex::new(Point3::new(2.0, 0.0, 0.0), Vector2::new(1.0, 4.0));
        let mid = a.interpolate(&b, 0.5);
        assert_eq!(mid.position, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(mid.uv, Vector2::new(0.5, 2.0));
    }
}
