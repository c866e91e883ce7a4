//! Shape abstraction
//!
//! A [`Shape`] pairs a [`ShapeKind`] with a position/rotation/scale
//! transform and answers the same surface queries for every variant:
//! closest point, closest point with outward normal, signed distance,
//! bounds and expanded bounds.
//!
//! Primitive variants fold the transform's scale into their dimensions and
//! work in a rotated, translated local frame, so their normals need no
//! rescaling. Mesh shapes query their spatial index in the mesh's unscaled
//! local frame and map the result back through the full transform. Under
//! non-uniform scale that is an approximation of the true nearest point.
//!
//! World bounds are cached. Every setter marks the shape dirty and the
//! bounds are recomputed on the next access, so a query never observes
//! bounds from an older transform.

mod kind;

pub use kind::{CapsuleAxis, MeshShape, ShapeKind};

use std::sync::{Arc, OnceLock};

use thiserror::Error;

use crate::foundation::math::{Quat, Transform, Vec3};
use crate::geometry::{primitives, Aabb, LocalHit};
use crate::spatial::{MeshError, MeshIndexConfig, TriangleMesh};

/// Errors reported by shape queries and mutations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShapeError {
    /// A mesh shape was queried before its spatial index was built
    #[error("mesh spatial index has not been built")]
    IndexNotBuilt,

    /// A mesh operation was requested on a primitive shape
    #[error("{0} shape has no mesh")]
    NotAMesh(&'static str),

    /// A dimension or scale component is out of range
    #[error("invalid {shape} shape: {reason}")]
    InvalidParameter {
        /// Variant name
        shape: &'static str,
        /// What is wrong
        reason: String,
    },

    /// Mesh data failed validation
    #[error("mesh error: {0}")]
    Mesh(#[from] MeshError),
}

/// Closest surface point, outward normal and signed distance in one query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    /// Closest point on the surface, world space
    pub point: Vec3,
    /// Outward unit normal, zero where the shape defines none
    pub normal: Vec3,
    /// Signed distance, negative inside, `f32::INFINITY` outside the domain
    pub signed_distance: f32,
}

/// A shape placed in the world
#[derive(Debug, Clone)]
pub struct Shape {
    transform: Transform,
    kind: ShapeKind,
    bounds: OnceLock<Aabb>,
}

impl Shape {
    /// Create a shape of the given kind at the identity transform
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            transform: Transform::identity(),
            kind,
            bounds: OnceLock::new(),
        }
    }

    /// Box with the given half extents
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(ShapeKind::Box { half_extents })
    }

    /// Sphere with the given radius
    pub fn sphere(radius: f32) -> Self {
        Self::new(ShapeKind::Sphere { radius })
    }

    /// Capsule with the given radius, total height and axis
    pub fn capsule(radius: f32, height: f32, axis: CapsuleAxis) -> Self {
        Self::new(ShapeKind::Capsule {
            radius,
            height,
            axis,
        })
    }

    /// Finite plane of the given width and height
    pub fn plane(width: f32, height: f32) -> Self {
        Self::new(ShapeKind::Plane { width, height })
    }

    /// Mesh shape with its spatial index built immediately
    pub fn mesh(mesh: Arc<TriangleMesh>, config: MeshIndexConfig) -> Self {
        Self::new(ShapeKind::Mesh(MeshShape::indexed(mesh, config)))
    }

    /// Mesh shape whose index must be built with [`Shape::build_mesh_index`]
    /// before it can be queried
    pub fn mesh_unindexed(mesh: Arc<TriangleMesh>, config: MeshIndexConfig) -> Self {
        Self::new(ShapeKind::Mesh(MeshShape::unindexed(mesh, config)))
    }

    /// Set the transform
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.set_transform(transform);
        self
    }

    /// Set the position
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_position(position);
        self
    }

    /// Set the rotation
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.set_rotation(rotation);
        self
    }

    /// Set the scale
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.set_scale(scale);
        self
    }

    /// Current transform
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Shape variant
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Mutable access to the variant parameters; marks the shape dirty
    pub fn kind_mut(&mut self) -> &mut ShapeKind {
        self.mark_dirty();
        &mut self.kind
    }

    /// Replace the transform
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.mark_dirty();
    }

    /// Move the shape
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
        self.mark_dirty();
    }

    /// Rotate the shape
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
        self.mark_dirty();
    }

    /// Rescale the shape
    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
        self.mark_dirty();
    }

    /// Replace the mesh of a mesh shape, rebuilding its index
    pub fn set_mesh(&mut self, mesh: Arc<TriangleMesh>) -> Result<(), ShapeError> {
        match &mut self.kind {
            ShapeKind::Mesh(mesh_shape) => {
                mesh_shape.set_mesh(mesh);
                self.mark_dirty();
                Ok(())
            }
            other => Err(ShapeError::NotAMesh(other.name())),
        }
    }

    /// Build the spatial index of a mesh shape
    pub fn build_mesh_index(&mut self) -> Result<(), ShapeError> {
        match &mut self.kind {
            ShapeKind::Mesh(mesh_shape) => {
                mesh_shape.build_index();
                Ok(())
            }
            other => Err(ShapeError::NotAMesh(other.name())),
        }
    }

    /// Invalidate cached bounds after an external change
    pub fn mark_dirty(&mut self) {
        self.bounds = OnceLock::new();
    }

    /// Whether cached bounds must be recomputed before use
    pub fn is_dirty(&self) -> bool {
        self.bounds.get().is_none()
    }

    /// Recompute cached bounds now
    pub fn refresh(&mut self) {
        self.bounds = OnceLock::from(self.compute_bounds());
    }

    /// Check dimensions and scale
    pub fn validate(&self) -> Result<(), ShapeError> {
        let name = self.kind.name();
        let invalid = |reason: &str| ShapeError::InvalidParameter {
            shape: name,
            reason: reason.to_string(),
        };
        let finite_non_negative = |v: f32| v.is_finite() && v >= 0.0;

        let scale = self.transform.scale;
        if !scale.iter().all(|s| s.is_finite() && *s != 0.0) {
            return Err(invalid("scale components must be finite and non-zero"));
        }
        if !self.transform.position.iter().all(|c| c.is_finite()) {
            return Err(invalid("position must be finite"));
        }

        match &self.kind {
            ShapeKind::Box { half_extents } => {
                if !half_extents.iter().all(|&h| finite_non_negative(h)) {
                    return Err(invalid("half extents must be finite and non-negative"));
                }
            }
            ShapeKind::Sphere { radius } => {
                if !finite_non_negative(*radius) {
                    return Err(invalid("radius must be finite and non-negative"));
                }
            }
            ShapeKind::Capsule { radius, height, .. } => {
                if !finite_non_negative(*radius) || !finite_non_negative(*height) {
                    return Err(invalid("radius and height must be finite and non-negative"));
                }
            }
            ShapeKind::Plane { width, height } => {
                if !finite_non_negative(*width) || !finite_non_negative(*height) {
                    return Err(invalid("width and height must be finite and non-negative"));
                }
            }
            ShapeKind::Mesh(mesh_shape) => mesh_shape.mesh().validate()?,
        }
        Ok(())
    }

    /// World-space bounds, recomputed if the shape is dirty
    pub fn bounds(&self) -> Aabb {
        *self.bounds.get_or_init(|| self.compute_bounds())
    }

    /// Bounds grown to cover every point within `expansion` of the surface
    ///
    /// A plane only acts on its front side, so its bounds are swept along
    /// the plane normal instead of grown in every direction.
    pub fn expanded_bounds(&self, expansion: f32) -> Aabb {
        let bounds = self.bounds();
        match self.kind {
            ShapeKind::Plane { .. } => {
                let offset = self.transform.rotate(Vec3::z()) * expansion.max(0.0);
                bounds.union(&Aabb::new(bounds.min + offset, bounds.max + offset))
            }
            _ => bounds.expanded(expansion),
        }
    }

    /// Closest point on the surface to a world point
    pub fn closest_point(&self, point: Vec3) -> Result<Vec3, ShapeError> {
        Ok(self.closest_point_with_normal(point)?.0)
    }

    /// Closest surface point and its outward unit normal
    ///
    /// For planes the normal is zero when the point is off the rectangle
    /// or behind it, meaning the point is outside the plane's domain.
    pub fn closest_point_with_normal(&self, point: Vec3) -> Result<(Vec3, Vec3), ShapeError> {
        if let ShapeKind::Mesh(mesh_shape) = &self.kind {
            let sample = self.mesh_sample(mesh_shape, point)?;
            return Ok((sample.point, sample.normal));
        }

        let hit = self.primitive_hit(self.to_local(point));
        Ok((self.to_world(hit.point), self.transform.rotate(hit.normal)))
    }

    /// Signed distance to the surface, negative inside
    pub fn signed_distance(&self, point: Vec3) -> Result<f32, ShapeError> {
        if let ShapeKind::Mesh(mesh_shape) = &self.kind {
            return Ok(self.mesh_sample(mesh_shape, point)?.signed_distance);
        }
        Ok(self.primitive_distance(self.to_local(point)))
    }

    /// Closest point, normal and signed distance in a single query
    pub fn surface_sample(&self, point: Vec3) -> Result<SurfaceSample, ShapeError> {
        if let ShapeKind::Mesh(mesh_shape) = &self.kind {
            return self.mesh_sample(mesh_shape, point);
        }

        let local = self.to_local(point);
        let hit = self.primitive_hit(local);
        Ok(SurfaceSample {
            point: self.to_world(hit.point),
            normal: self.transform.rotate(hit.normal),
            signed_distance: self.primitive_distance(local),
        })
    }

    /// World point into the rotated, translated (but unscaled) local frame
    fn to_local(&self, point: Vec3) -> Vec3 {
        self.transform.inverse_rotate(point - self.transform.position)
    }

    fn to_world(&self, local: Vec3) -> Vec3 {
        self.transform.position + self.transform.rotate(local)
    }

    fn scaled_half_extents(&self, half_extents: Vec3) -> Vec3 {
        half_extents.component_mul(&self.transform.abs_scale())
    }

    fn scaled_radius(&self, radius: f32) -> f32 {
        radius * self.transform.max_abs_scale()
    }

    /// Half segment length and radius of a capsule after scale
    fn scaled_capsule(&self, radius: f32, height: f32, axis: CapsuleAxis) -> (f32, f32) {
        let scale = self.transform.abs_scale();
        let a = axis.index();
        let radial = scale[(a + 1) % 3].max(scale[(a + 2) % 3]);
        let radius = radius * radial;
        let half_segment = (height * scale[a] * 0.5 - radius).max(0.0);
        (half_segment, radius)
    }

    fn scaled_plane(&self, width: f32, height: f32) -> (f32, f32) {
        let scale = self.transform.abs_scale();
        (width * 0.5 * scale.x, height * 0.5 * scale.y)
    }

    fn primitive_hit(&self, local: Vec3) -> LocalHit {
        match &self.kind {
            ShapeKind::Box { half_extents } => {
                primitives::box_closest(local, self.scaled_half_extents(*half_extents))
            }
            ShapeKind::Sphere { radius } => primitives::sphere_closest(local, self.scaled_radius(*radius)),
            ShapeKind::Capsule {
                radius,
                height,
                axis,
            } => {
                let (half_segment, radius) = self.scaled_capsule(*radius, *height, *axis);
                primitives::capsule_closest(local, axis.index(), half_segment, radius)
            }
            ShapeKind::Plane { width, height } => {
                let (hw, hh) = self.scaled_plane(*width, *height);
                primitives::plane_closest(local, hw, hh)
            }
            ShapeKind::Mesh(_) => LocalHit {
                point: local,
                normal: Vec3::zeros(),
            },
        }
    }

    fn primitive_distance(&self, local: Vec3) -> f32 {
        match &self.kind {
            ShapeKind::Box { half_extents } => {
                primitives::box_signed_distance(local, self.scaled_half_extents(*half_extents))
            }
            ShapeKind::Sphere { radius } => {
                primitives::sphere_signed_distance(local, self.scaled_radius(*radius))
            }
            ShapeKind::Capsule {
                radius,
                height,
                axis,
            } => {
                let (half_segment, radius) = self.scaled_capsule(*radius, *height, *axis);
                primitives::capsule_signed_distance(local, axis.index(), half_segment, radius)
            }
            ShapeKind::Plane { width, height } => {
                let (hw, hh) = self.scaled_plane(*width, *height);
                primitives::plane_signed_distance(local, hw, hh)
            }
            ShapeKind::Mesh(_) => f32::INFINITY,
        }
    }

    fn mesh_sample(&self, mesh_shape: &MeshShape, point: Vec3) -> Result<SurfaceSample, ShapeError> {
        let index = mesh_shape.index().ok_or(ShapeError::IndexNotBuilt)?;

        let local = self.transform.inverse_transform_point(point);
        let hit = index.closest_point_with_normal(local);

        let surface = self.transform.transform_point(hit.point);
        let normal = self.transform.transform_normal(hit.normal);
        let offset = point - surface;
        let distance = offset.magnitude();
        let signed_distance = if normal.dot(&offset) >= 0.0 { distance } else { -distance };

        Ok(SurfaceSample {
            point: surface,
            normal,
            signed_distance,
        })
    }

    fn compute_bounds(&self) -> Aabb {
        let transform = &self.transform;
        match &self.kind {
            ShapeKind::Box { half_extents } => {
                Aabb::from_oriented(transform, self.scaled_half_extents(*half_extents))
            }
            ShapeKind::Sphere { radius } => {
                Aabb::from_center_extents(transform.position, Vec3::repeat(self.scaled_radius(*radius)))
            }
            ShapeKind::Capsule {
                radius,
                height,
                axis,
            } => {
                let (half_segment, radius) = self.scaled_capsule(*radius, *height, *axis);
                let mut half = Vec3::repeat(radius);
                half[axis.index()] += half_segment;
                Aabb::from_oriented(transform, half)
            }
            ShapeKind::Plane { width, height } => {
                let (hw, hh) = self.scaled_plane(*width, *height);
                Aabb::from_oriented(transform, Vec3::new(hw, hh, 0.0))
            }
            ShapeKind::Mesh(mesh_shape) => {
                let local = Aabb::from_points(mesh_shape.mesh().vertices().iter().copied())
                    .unwrap_or_else(|| Aabb::from_center_extents(Vec3::zeros(), Vec3::zeros()));
                let corners = (0..8).map(|i| {
                    Vec3::new(
                        if i & 1 == 0 { local.min.x } else { local.max.x },
                        if i & 2 == 0 { local.min.y } else { local.max.y },
                        if i & 4 == 0 { local.min.z } else { local.max.z },
                    )
                });
                Aabb::from_points(corners.map(|c| transform.transform_point(c)))
                    .unwrap_or_else(|| Aabb::from_center_extents(transform.position, Vec3::zeros()))
            }
        }
    }
}
