//! Math utilities and types
//!
//! Provides the vector, rotation and transform types used by every shape
//! and producer. Points and directions are both carried as [`Vec3`].

pub use nalgebra::{Matrix3, UnitQuaternion, Vector3};

/// Points, directions and extents
pub type Vec3 = Vector3<f32>;

/// Rotation matrices (used for oriented bounds)
pub type Mat3 = Matrix3<f32>;

/// Unit quaternion rotation
pub type Quat = UnitQuaternion<f32>;

/// Below this squared length a direction is treated as zero
pub const DIRECTION_EPSILON_SQ: f32 = 1e-12;

/// Transform representing position, rotation, and (possibly non-uniform) scale
///
/// Applied as scale, then rotation, then translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform from all three components
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Map a local point to world space
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * self.scale.component_mul(&local)
    }

    /// Map a world point into local space (scale removed)
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.inverse_rotate(world - self.position)
            .component_div(&self.scale)
    }

    /// Rotate a vector without scaling it
    pub fn rotate(&self, local: Vec3) -> Vec3 {
        self.rotation * local
    }

    /// Undo the rotation of a vector without scaling it
    pub fn inverse_rotate(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse_transform_vector(&world)
    }

    /// Map a local surface normal to a unit world normal
    ///
    /// Uses the inverse transpose of rotation * scale, so normals stay
    /// perpendicular to surfaces under non-uniform scale. A zero normal
    /// stays zero.
    pub fn transform_normal(&self, local: Vec3) -> Vec3 {
        let world = self.rotation * local.component_div(&self.scale);
        normalize_or_zero(world)
    }

    /// Largest absolute scale component (worst-case radius scaling)
    pub fn max_abs_scale(&self) -> f32 {
        utils::max_component(&self.scale.abs())
    }

    /// Absolute value of the scale
    pub fn abs_scale(&self) -> Vec3 {
        self.scale.abs()
    }
}

/// Normalize a vector, returning zero for (near) zero-length input
pub fn normalize_or_zero(v: Vec3) -> Vec3 {
    v.try_normalize(DIRECTION_EPSILON_SQ.sqrt())
        .unwrap_or_else(Vec3::zeros)
}

/// Scalar helpers
pub mod utils {
    use super::Vec3;

    /// Degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    /// Clamp to the unit interval
    pub fn saturate(value: f32) -> f32 {
        value.clamp(0.0, 1.0)
    }

    /// Largest component of a vector
    pub fn max_component(v: &Vec3) -> f32 {
        v.x.max(v.y).max(v.z)
    }
}
