//! Closed-form closest-point and signed-distance functions
//!
//! Every function here works in a shape's *scaled local frame*: translation
//! and rotation have been removed from the query point, while the shape's
//! scale has been folded into its dimensions (half extents, radius, segment
//! length). Results in this frame map back to world space with rotation and
//! translation only, so normals never need rescaling.

use crate::foundation::math::{utils, Vec3};

/// Closest surface point and outward unit normal in a shape's local frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalHit {
    /// Closest point on the surface
    pub point: Vec3,
    /// Outward unit normal, or zero when undefined
    pub normal: Vec3,
}

/// Unit vector along axis `index` (0 = x, 1 = y, 2 = z)
pub fn unit_axis(index: usize) -> Vec3 {
    let mut axis = Vec3::zeros();
    axis[index.min(2)] = 1.0;
    axis
}

/// Slack for points lying on a plane's edge or surface after a transform
/// round trip
pub const PLANE_EPSILON: f32 = 1e-5;

fn sign(value: f32) -> f32 {
    if value >= 0.0 { 1.0 } else { -1.0 }
}

/// Closest point on a box surface, with the face normal of the chosen face
///
/// Outside the box the point is clamped onto the box and the face is the
/// axis of largest overshoot. Inside, the point snaps to the face of least
/// penetration.
pub fn box_closest(local: Vec3, half_extents: Vec3) -> LocalHit {
    let half = half_extents.abs();
    let overshoot = local.abs() - half;

    if utils::max_component(&overshoot) > 0.0 {
        let point = local.sup(&(-half)).inf(&half);
        let axis = overshoot.imax();
        return LocalHit {
            point,
            normal: unit_axis(axis) * sign(local[axis]),
        };
    }

    // Inside: least penetration is the largest (closest to zero) overshoot
    let axis = overshoot.imax();
    let mut point = local;
    point[axis] = half[axis] * sign(local[axis]);
    LocalHit {
        point,
        normal: unit_axis(axis) * sign(local[axis]),
    }
}

/// Signed distance to a box surface
pub fn box_signed_distance(local: Vec3, half_extents: Vec3) -> f32 {
    let q = local.abs() - half_extents.abs();
    let outside = q.sup(&Vec3::zeros()).magnitude();
    let inside = utils::max_component(&q).min(0.0);
    outside + inside
}

/// Closest point on a sphere centred at the local origin
///
/// A query at the exact centre resolves toward local +Y.
pub fn sphere_closest(local: Vec3, radius: f32) -> LocalHit {
    let direction = local
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(|| unit_axis(1));
    LocalHit {
        point: direction * radius,
        normal: direction,
    }
}

/// Signed distance to a sphere centred at the local origin
pub fn sphere_signed_distance(local: Vec3, radius: f32) -> f32 {
    local.magnitude() - radius
}

/// Closest point on the medial segment of a capsule
fn capsule_segment_point(local: Vec3, axis: usize, half_segment: f32) -> Vec3 {
    let half = half_segment.max(0.0);
    unit_axis(axis) * local[axis].clamp(-half, half)
}

/// Closest point on a capsule whose medial segment runs along `axis`
///
/// `half_segment` is half the distance between the two cap centres.
pub fn capsule_closest(local: Vec3, axis: usize, half_segment: f32, radius: f32) -> LocalHit {
    let on_segment = capsule_segment_point(local, axis, half_segment);
    let direction = (local - on_segment)
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(|| unit_axis((axis + 1) % 3));
    LocalHit {
        point: on_segment + direction * radius,
        normal: direction,
    }
}

/// Signed distance to a capsule whose medial segment runs along `axis`
pub fn capsule_signed_distance(local: Vec3, axis: usize, half_segment: f32, radius: f32) -> f32 {
    let on_segment = capsule_segment_point(local, axis, half_segment);
    (local - on_segment).magnitude() - radius
}

/// Whether a local point projects inside a plane rectangle's footprint
pub fn plane_footprint_contains(local: Vec3, half_width: f32, half_height: f32) -> bool {
    local.x.abs() <= half_width.abs() + PLANE_EPSILON
        && local.y.abs() <= half_height.abs() + PLANE_EPSILON
}

fn plane_in_front(local: Vec3) -> bool {
    local.z >= -PLANE_EPSILON
}

/// Closest point on a finite plane lying in local XY, facing local +Z
///
/// The normal is zero unless the query point is over the rectangle and on
/// (or in front of) the plane.
pub fn plane_closest(local: Vec3, half_width: f32, half_height: f32) -> LocalHit {
    let (hw, hh) = (half_width.abs(), half_height.abs());
    let point = Vec3::new(local.x.clamp(-hw, hw), local.y.clamp(-hh, hh), 0.0);
    let facing = plane_footprint_contains(local, hw, hh) && plane_in_front(local);
    LocalHit {
        point,
        normal: if facing { unit_axis(2) } else { Vec3::zeros() },
    }
}

/// Signed distance to a finite plane, `f32::INFINITY` off the rectangle or behind it
pub fn plane_signed_distance(local: Vec3, half_width: f32, half_height: f32) -> f32 {
    if plane_footprint_contains(local, half_width, half_height) && plane_in_front(local) {
        local.z.max(0.0)
    } else {
        f32::INFINITY
    }
}
