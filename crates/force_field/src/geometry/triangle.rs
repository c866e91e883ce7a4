//! Triangle closest-point queries
//!
//! Voronoi-region projection of a point onto a triangle, returning the
//! barycentric weights of the projected point so callers can interpolate
//! per-vertex attributes such as normals.

use crate::foundation::math::{normalize_or_zero, Vec3};

/// A triangle in some common frame
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

/// Closest point on a triangle together with its barycentric weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrianglePoint {
    /// The closest point
    pub point: Vec3,
    /// Weights of `v0`, `v1`, `v2`; they sum to one
    pub barycentric: Vec3,
}

impl TrianglePoint {
    fn at(point: Vec3, u: f32, v: f32, w: f32) -> Self {
        Self {
            point,
            barycentric: Vec3::new(u, v, w),
        }
    }

    /// Interpolate three per-vertex values with the barycentric weights
    pub fn interpolate(&self, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
        a * self.barycentric.x + b * self.barycentric.y + c * self.barycentric.z
    }
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Face normal (right-hand rule), zero for a degenerate triangle
    pub fn normal(&self) -> Vec3 {
        normalize_or_zero(self.scaled_normal())
    }

    /// Cross product of the two edges; its length is twice the area
    pub fn scaled_normal(&self) -> Vec3 {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Area of the triangle
    pub fn area(&self) -> f32 {
        self.scaled_normal().magnitude() * 0.5
    }

    /// Calculates the centroid (center point) of the triangle
    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Get the closest point on the triangle to a given point
    ///
    /// Tests the vertex regions, then the edge regions, and finally
    /// projects onto the face interior.
    pub fn closest_point(&self, point: Vec3) -> TrianglePoint {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let v0_to_point = point - self.v0;
        let d1 = edge1.dot(&v0_to_point);
        let d2 = edge2.dot(&v0_to_point);
        if d1 <= 0.0 && d2 <= 0.0 {
            return TrianglePoint::at(self.v0, 1.0, 0.0, 0.0);
        }

        let v1_to_point = point - self.v1;
        let d3 = edge1.dot(&v1_to_point);
        let d4 = edge2.dot(&v1_to_point);
        if d3 >= 0.0 && d4 <= d3 {
            return TrianglePoint::at(self.v1, 0.0, 1.0, 0.0);
        }

        // Edge v0-v1
        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let t = d1 / (d1 - d3);
            return TrianglePoint::at(self.v0 + edge1 * t, 1.0 - t, t, 0.0);
        }

        let v2_to_point = point - self.v2;
        let d5 = edge1.dot(&v2_to_point);
        let d6 = edge2.dot(&v2_to_point);
        if d6 >= 0.0 && d5 <= d6 {
            return TrianglePoint::at(self.v2, 0.0, 0.0, 1.0);
        }

        // Edge v0-v2
        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let t = d2 / (d2 - d6);
            return TrianglePoint::at(self.v0 + edge2 * t, 1.0 - t, 0.0, t);
        }

        // Edge v1-v2
        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let t = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return TrianglePoint::at(self.v1 + (self.v2 - self.v1) * t, 0.0, 1.0 - t, t);
        }

        let sum = va + vb + vc;
        if sum.abs() <= f32::EPSILON {
            // Collinear vertices with the point over the segment interior
            return TrianglePoint::at(self.v0, 1.0, 0.0, 0.0);
        }
        let denom = 1.0 / sum;
        let v = vb * denom;
        let w = vc * denom;
        TrianglePoint::at(self.v0 + edge1 * v + edge2 * w, 1.0 - v - w, v, w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_triangle() -> Triangle {
        Triangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_face_interior_projection() {
        let hit = unit_triangle().closest_point(Vec3::new(0.25, 0.25, 3.0));
        assert_relative_eq!(hit.point, Vec3::new(0.25, 0.25, 0.0), epsilon = 1e-6);
        assert_relative_eq!(hit.barycentric, Vec3::new(0.5, 0.25, 0.25), epsilon = 1e-6);
    }

    #[test]
    fn test_vertex_regions() {
        let tri = unit_triangle();
        assert_eq!(tri.closest_point(Vec3::new(-1.0, -1.0, 0.0)).point, tri.v0);
        assert_eq!(tri.closest_point(Vec3::new(2.0, -0.5, 1.0)).point, tri.v1);
        assert_eq!(tri.closest_point(Vec3::new(-0.5, 2.0, -1.0)).point, tri.v2);
    }

    #[test]
    fn test_edge_regions() {
        let tri = unit_triangle();

        let bottom = tri.closest_point(Vec3::new(0.5, -1.0, 0.0));
        assert_relative_eq!(bottom.point, Vec3::new(0.5, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(bottom.barycentric, Vec3::new(0.5, 0.5, 0.0), epsilon = 1e-6);

        let left = tri.closest_point(Vec3::new(-2.0, 0.25, 0.0));
        assert_relative_eq!(left.point, Vec3::new(0.0, 0.25, 0.0), epsilon = 1e-6);

        let hypotenuse = tri.closest_point(Vec3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(hypotenuse.point, Vec3::new(0.5, 0.5, 0.0), epsilon = 1e-6);
        assert_relative_eq!(hypotenuse.barycentric, Vec3::new(0.0, 0.5, 0.5), epsilon = 1e-6);
    }

    #[test]
    fn test_interpolate_normals() {
        let hit = unit_triangle().closest_point(Vec3::new(0.5, 0.0, 1.0));
        let normal = hit.interpolate(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(normal, Vec3::new(0.5, 0.0, 0.5), epsilon = 1e-6);
    }

    #[test]
    fn test_area_and_normal() {
        let tri = unit_triangle();
        assert_relative_eq!(tri.area(), 0.5);
        assert_relative_eq!(tri.normal(), Vec3::new(0.0, 0.0, 1.0));
        assert_relative_eq!(tri.centroid(), Vec3::new(1.0 / 3.0, 1.0 / 3.0, 0.0), epsilon = 1e-6);
    }
}
