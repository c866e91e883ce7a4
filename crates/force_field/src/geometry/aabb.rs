//! Axis-aligned bounding boxes
//!
//! Used for cached shape bounds, zone producers and range culling.

use crate::foundation::math::{Mat3, Transform, Vec3};

/// Axis-aligned bounding box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.inf(&max),
            max: min.sup(&max),
        }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        let extents = extents.abs();
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest box containing every point, `None` for an empty iterator
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self { min: first, max: first }, |acc, p| acc.including(p)))
    }

    /// World bounds of an oriented box with the given local half extents
    ///
    /// The half extents are expected to already include the transform's
    /// scale. Only the rotation and position of `transform` are used.
    pub fn from_oriented(transform: &Transform, half_extents: Vec3) -> Self {
        let rotation: Mat3 = *transform.rotation.to_rotation_matrix().matrix();
        let extents = rotation.abs() * half_extents.abs();
        Self::from_center_extents(transform.position, extents)
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Grow the box by `amount` on every side
    #[must_use]
    pub fn expanded(&self, amount: f32) -> Self {
        let grow = Vec3::repeat(amount.max(0.0));
        Self {
            min: self.min - grow,
            max: self.max + grow,
        }
    }

    /// Smallest box containing both boxes
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Smallest box containing this box and a point
    #[must_use]
    pub fn including(&self, point: Vec3) -> Self {
        Self {
            min: self.min.inf(&point),
            max: self.max.sup(&point),
        }
    }

    /// Euclidean distance from a point to the box, zero inside
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        let below = self.min - point;
        let above = point - self.max;
        below.sup(&above).sup(&Vec3::zeros()).magnitude()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_orders_corners() {
        let aabb = Aabb::new(Vec3::new(1.0, -1.0, 2.0), Vec3::new(-1.0, 1.0, 0.0));
        assert_eq!(aabb.min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 1.0, 2.0));
    }

    #[test]
    fn test_contains_point() {
        let a = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        assert!(a.contains_point(Vec3::new(0.5, -0.5, 1.0)));
        assert!(!a.contains_point(Vec3::new(1.01, 0.0, 0.0)));
    }

    #[test]
    fn test_oriented_bounds_of_rotated_box() {
        let transform = Transform::new(
            Vec3::new(0.0, 2.0, 0.0),
            Quat::from_euler_angles(0.0, 0.0, std::f32::consts::FRAC_PI_4),
            Vec3::repeat(1.0),
        );
        let aabb = Aabb::from_oriented(&transform, Vec3::new(1.0, 1.0, 1.0));

        let diagonal = std::f32::consts::SQRT_2;
        assert_relative_eq!(aabb.extents(), Vec3::new(diagonal, diagonal, 1.0), epsilon = 1e-5);
        assert_relative_eq!((aabb.min + aabb.max) * 0.5, Vec3::new(0.0, 2.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_distance_to_point() {
        let aabb = Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(aabb.distance_to_point(Vec3::new(0.5, 0.5, 0.5)), 0.0);
        assert_relative_eq!(aabb.distance_to_point(Vec3::new(4.0, 0.5, 5.0)), 5.0);
    }

    #[test]
    fn test_from_points() {
        assert!(Aabb::from_points(Vec::<Vec3>::new()).is_none());

        let aabb = Aabb::from_points([
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(-1.0, 0.0, 4.0),
        ])
        .unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, 0.0, 3.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 4.0));
    }
}
