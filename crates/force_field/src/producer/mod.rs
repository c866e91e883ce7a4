//! Force producers
//!
//! A [`ForceProducer`] owns its geometry (a [`ProducerKind`]) together with
//! the blending attributes the composition engine reads at query time:
//! category, strength, falloff, importance, additive/override mode, invert,
//! enabled flag and layer mask.
//!
//! Evaluation yields two things per point. The *vector* is the full-strength
//! force (direction times producer strength, negated when inverted). The
//! *strength* is the falloff coverage in `[0, 1]`: 1 inside the producer's
//! full-strength region, decaying linearly to 0 over the falloff distance.
//! The engine uses the coverage as an alpha when compositing.

mod kind;
mod layers;

pub use kind::ProducerKind;
pub use layers::{LayerMask, MAX_LAYER};

use thiserror::Error;

use crate::category::CategoryId;
use crate::foundation::math::{normalize_or_zero, utils, Vec3, DIRECTION_EPSILON_SQ};
use crate::geometry::Aabb;
use crate::shape::{Shape, ShapeError};

/// Errors reported when validating a producer
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProducerError {
    /// Producer strength is NaN or infinite
    #[error("producer strength must be finite, got {0}")]
    InvalidStrength(f32),

    /// Falloff distance is negative or not finite
    #[error("falloff must be finite and non-negative, got {0}")]
    InvalidFalloff(f32),

    /// A range or radius parameter is negative or not finite
    #[error("{parameter} of {kind} producer must be finite and non-negative, got {value}")]
    InvalidRange {
        /// Variant name
        kind: &'static str,
        /// Parameter name
        parameter: &'static str,
        /// Offending value
        value: f32,
    },

    /// A directional producer has no usable direction
    #[error("{0} producer direction has zero length")]
    ZeroDirection(&'static str),

    /// The producer's shape is invalid
    #[error("producer shape: {0}")]
    Shape(#[from] ShapeError),
}

/// Strength of a linear falloff at `distance`
///
/// Returns 1 up to `inner`, then decays linearly to 0 at `inner + falloff`.
/// A falloff of zero (or less) is a hard step at `inner`.
pub fn linear_falloff(distance: f32, inner: f32, falloff: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    if distance <= inner {
        return 1.0;
    }
    if falloff <= 0.0 {
        return 0.0;
    }
    utils::saturate(1.0 - (distance - inner) / falloff)
}

/// A producer's contribution at one point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceSample {
    /// Full-strength force vector, already inverted when the producer is
    pub vector: Vec3,
    /// Falloff coverage in `[0, 1]`
    pub strength: f32,
}

impl ForceSample {
    /// No contribution
    pub const NONE: Self = Self {
        vector: Vec3::new(0.0, 0.0, 0.0),
        strength: 0.0,
    };

    /// Vector scaled by coverage
    pub fn weighted(&self) -> Vec3 {
        self.vector * self.strength
    }
}

/// A single source of force
#[derive(Debug, Clone)]
pub struct ForceProducer {
    /// Display name used in logs
    pub name: String,
    /// Geometry and direction policy
    pub kind: ProducerKind,
    /// Category the producer contributes to
    pub category: CategoryId,
    /// Force magnitude at full coverage; may be negative
    pub strength: f32,
    /// Distance over which coverage decays from 1 to 0
    pub falloff: f32,
    /// Precedence among override producers; 0 means no precedence
    pub importance: i32,
    /// Sum with other producers instead of alpha compositing
    pub additive: bool,
    /// Negate the force direction
    pub invert: bool,
    /// Disabled producers never contribute
    pub enabled: bool,
    /// Layers the producer acts on
    pub layers: LayerMask,
}

impl ForceProducer {
    /// Producer of the given kind with default attributes
    ///
    /// Defaults: category `generic`, strength 10, falloff 0, importance 1,
    /// override mode, not inverted, enabled, every layer.
    pub fn new(kind: ProducerKind) -> Self {
        Self {
            name: String::new(),
            kind,
            category: CategoryId::generic(),
            strength: 10.0,
            falloff: 0.0,
            importance: 1,
            additive: false,
            invert: false,
            enabled: true,
            layers: LayerMask::ALL,
        }
    }

    /// Unbounded producer pushing along `direction`
    pub fn global(direction: Vec3) -> Self {
        Self::new(ProducerKind::Global { direction })
    }

    /// Producer pushing along `direction` inside an axis-aligned box
    pub fn zone(bounds: Aabb, direction: Vec3) -> Self {
        Self::new(ProducerKind::Zone { bounds, direction })
    }

    /// Producer pushing along `direction` inside a shape
    pub fn shape_zone(shape: Shape, direction: Vec3) -> Self {
        Self::new(ProducerKind::ShapeZone { shape, direction })
    }

    /// Producer pulling toward a shape's surface
    pub fn surface(shape: Shape, range: f32) -> Self {
        Self::new(ProducerKind::Surface { shape, range })
    }

    /// Producer pushing away from a point
    pub fn point(center: Vec3, radius: f32) -> Self {
        Self::new(ProducerKind::Point { center, radius })
    }

    /// Set the display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the category
    #[must_use]
    pub fn with_category(mut self, category: impl Into<CategoryId>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the strength
    #[must_use]
    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    /// Set the falloff distance
    #[must_use]
    pub fn with_falloff(mut self, falloff: f32) -> Self {
        self.falloff = falloff;
        self
    }

    /// Set the importance
    #[must_use]
    pub fn with_importance(mut self, importance: i32) -> Self {
        self.importance = importance;
        self
    }

    /// Switch between additive and override mode
    #[must_use]
    pub fn with_additive(mut self, additive: bool) -> Self {
        self.additive = additive;
        self
    }

    /// Set whether the direction is negated
    #[must_use]
    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Enable or disable the producer
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the layer mask
    #[must_use]
    pub fn with_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }

    /// Label for log output
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            self.kind.name()
        } else {
            &self.name
        }
    }

    /// Whether the producer can contribute at all
    pub fn is_active(&self) -> bool {
        self.enabled
    }

    /// Whether the producer takes part in the importance-ordered override pass
    pub fn is_override(&self) -> bool {
        !self.additive
    }

    /// Whether the producer acts on `layer`; `None` matches every producer
    pub fn matches_layer(&self, layer: Option<u8>) -> bool {
        layer.map_or(true, |layer| self.layers.contains_layer(layer))
    }

    /// The producer's shape, if it has one
    pub fn shape(&self) -> Option<&Shape> {
        self.kind.shape()
    }

    /// Mutable access to the producer's shape; setters on the shape keep
    /// its bounds current
    pub fn shape_mut(&mut self) -> Option<&mut Shape> {
        self.kind.shape_mut()
    }

    /// Invalidate cached shape data after an external change
    pub fn mark_dirty(&mut self) {
        if let Some(shape) = self.kind.shape_mut() {
            shape.mark_dirty();
        }
    }

    /// Recompute cached shape data now
    pub fn refresh(&mut self) {
        if let Some(shape) = self.kind.shape_mut() {
            shape.refresh();
        }
    }

    /// Check that every attribute is usable
    pub fn validate(&self) -> Result<(), ProducerError> {
        if !self.strength.is_finite() {
            return Err(ProducerError::InvalidStrength(self.strength));
        }
        if !self.falloff.is_finite() || self.falloff < 0.0 {
            return Err(ProducerError::InvalidFalloff(self.falloff));
        }

        let kind = self.kind.name();
        if let Some(direction) = self.kind.direction() {
            if !direction.iter().all(|c| c.is_finite())
                || direction.magnitude_squared() <= DIRECTION_EPSILON_SQ
            {
                return Err(ProducerError::ZeroDirection(kind));
            }
        }

        let check_range = |parameter: &'static str, value: f32| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ProducerError::InvalidRange {
                    kind,
                    parameter,
                    value,
                })
            }
        };

        match &self.kind {
            ProducerKind::Global { .. } => {}
            ProducerKind::Zone { bounds, .. } => {
                let finite = bounds.min.iter().chain(bounds.max.iter()).all(|c| c.is_finite());
                if !finite {
                    return Err(ProducerError::InvalidRange {
                        kind,
                        parameter: "bounds",
                        value: f32::NAN,
                    });
                }
            }
            ProducerKind::ShapeZone { shape, .. } => shape.validate()?,
            ProducerKind::Surface { shape, range } => {
                check_range("range", *range)?;
                shape.validate()?;
            }
            ProducerKind::Point { center, radius } => {
                check_range("radius", *radius)?;
                if !center.iter().all(|c| c.is_finite()) {
                    return Err(ProducerError::InvalidRange {
                        kind,
                        parameter: "center",
                        value: f32::NAN,
                    });
                }
            }
        }
        Ok(())
    }

    /// Cheap bounds test: `false` guarantees zero coverage at `point`
    pub fn in_range(&self, point: Vec3) -> bool {
        match &self.kind {
            ProducerKind::Global { .. } => true,
            ProducerKind::Zone { bounds, .. } => bounds.expanded(self.falloff).contains_point(point),
            ProducerKind::ShapeZone { shape, .. } => {
                shape.expanded_bounds(self.falloff).contains_point(point)
            }
            ProducerKind::Surface { shape, range } => shape
                .expanded_bounds(range.max(0.0) + self.falloff)
                .contains_point(point),
            ProducerKind::Point { center, radius } => {
                let reach = radius.max(0.0) + self.falloff;
                (point - center).magnitude_squared() <= reach * reach
            }
        }
    }

    /// Force at `point` ignoring range and falloff
    pub fn force_vector(&self, point: Vec3) -> Result<Vec3, ShapeError> {
        let direction = match &self.kind {
            ProducerKind::Global { direction }
            | ProducerKind::Zone { direction, .. }
            | ProducerKind::ShapeZone { direction, .. } => normalize_or_zero(*direction),
            ProducerKind::Surface { shape, .. } => -shape.closest_point_with_normal(point)?.1,
            ProducerKind::Point { center, .. } => normalize_or_zero(point - center),
        };
        Ok(self.oriented(direction))
    }

    /// Full-strength force and falloff coverage at `point`
    ///
    /// Beyond the falloff distance (or outside a plane's domain) the sample
    /// is [`ForceSample::NONE`]. Querying a mesh shape whose index has not
    /// been built is an error.
    pub fn sample(&self, point: Vec3) -> Result<ForceSample, ShapeError> {
        let (direction, strength) = match &self.kind {
            ProducerKind::Global { direction } => (normalize_or_zero(*direction), 1.0),
            ProducerKind::Zone { bounds, direction } => (
                normalize_or_zero(*direction),
                linear_falloff(bounds.distance_to_point(point), 0.0, self.falloff),
            ),
            ProducerKind::ShapeZone { shape, direction } => (
                normalize_or_zero(*direction),
                linear_falloff(shape.signed_distance(point)?, 0.0, self.falloff),
            ),
            ProducerKind::Surface { shape, range } => {
                let surface = shape.surface_sample(point)?;
                if surface.normal == Vec3::zeros() {
                    return Ok(ForceSample::NONE);
                }
                (
                    -surface.normal,
                    linear_falloff(surface.signed_distance, *range, self.falloff),
                )
            }
            ProducerKind::Point { center, radius } => {
                let offset = point - center;
                (
                    normalize_or_zero(offset),
                    linear_falloff(offset.magnitude(), *radius, self.falloff),
                )
            }
        };

        if strength <= 0.0 {
            return Ok(ForceSample::NONE);
        }
        Ok(ForceSample {
            vector: self.oriented(direction),
            strength,
        })
    }

    /// Scale a unit direction by strength, negated when inverted
    fn oriented(&self, direction: Vec3) -> Vec3 {
        let vector = direction * self.strength;
        if self.invert {
            -vector
        } else {
            vector
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{MeshIndexConfig, TriangleMesh};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn sphere_producer() -> ForceProducer {
        ForceProducer::surface(Shape::sphere(2.0), 0.0)
            .with_strength(5.0)
            .with_falloff(1.0)
    }

    #[test]
    fn test_linear_falloff() {
        assert_relative_eq!(linear_falloff(0.5, 1.0, 2.0), 1.0);
        assert_relative_eq!(linear_falloff(2.0, 1.0, 2.0), 0.5);
        assert_relative_eq!(linear_falloff(3.0, 1.0, 2.0), 0.0);
        assert_relative_eq!(linear_falloff(10.0, 1.0, 2.0), 0.0);
        assert_relative_eq!(linear_falloff(f32::INFINITY, 0.0, 2.0), 0.0);
        assert_relative_eq!(linear_falloff(f32::NAN, 0.0, 2.0), 0.0);
    }

    #[test]
    fn test_zero_falloff_is_a_hard_step() {
        assert_relative_eq!(linear_falloff(1.0, 1.0, 0.0), 1.0);
        assert_relative_eq!(linear_falloff(1.0001, 1.0, 0.0), 0.0);
    }

    #[test]
    fn test_defaults() {
        let producer = ForceProducer::global(Vec3::y());
        assert_relative_eq!(producer.strength, 10.0);
        assert_relative_eq!(producer.falloff, 0.0);
        assert_eq!(producer.importance, 1);
        assert!(producer.is_override());
        assert!(producer.is_active());
        assert_eq!(producer.layers, LayerMask::ALL);
        assert_eq!(producer.category, CategoryId::generic());
        assert_eq!(producer.label(), "global");
    }

    #[test]
    fn test_sphere_surface_falloff() {
        let producer = sphere_producer();

        let inside = producer.sample(Vec3::new(1.5, 0.0, 0.0)).unwrap();
        assert_relative_eq!(inside.strength, 1.0);
        assert_relative_eq!(inside.vector, Vec3::new(-5.0, 0.0, 0.0), epsilon = 1e-6);

        let band = producer.sample(Vec3::new(0.0, 2.5, 0.0)).unwrap();
        assert_relative_eq!(band.strength, 0.5, epsilon = 1e-6);
        assert_relative_eq!(band.weighted(), Vec3::new(0.0, -2.5, 0.0), epsilon = 1e-5);

        assert_eq!(producer.sample(Vec3::new(0.0, 0.0, 4.0)).unwrap(), ForceSample::NONE);
    }

    #[test]
    fn test_falloff_is_monotonic_outward() {
        let producer = sphere_producer();
        let direction = Vec3::new(1.0, 2.0, -0.5).normalize();

        assert_relative_eq!(producer.sample(direction * 2.0).unwrap().strength, 1.0, epsilon = 1e-5);
        assert_relative_eq!(producer.sample(Vec3::new(3.0, 0.0, 0.0)).unwrap().strength, 0.0);

        let mut previous = f32::INFINITY;
        for step in 0..=40 {
            let distance = 0.1 * step as f32;
            let strength = producer.sample(direction * distance).unwrap().strength;
            assert!(strength <= previous + 1e-6, "strength rose at distance {distance}");
            assert!((0.0..=1.0).contains(&strength));
            previous = strength;
        }
    }

    #[test]
    fn test_invert_flips_vector_not_strength() {
        let producer = sphere_producer().with_invert(true);
        let sample = producer.sample(Vec3::new(0.0, 2.5, 0.0)).unwrap();
        assert_relative_eq!(sample.strength, 0.5, epsilon = 1e-6);
        assert_relative_eq!(sample.vector, Vec3::new(0.0, 5.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(
            producer.force_vector(Vec3::new(0.0, 10.0, 0.0)).unwrap(),
            Vec3::new(0.0, 5.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_surface_range_extends_full_strength() {
        let producer = ForceProducer::surface(Shape::sphere(1.0), 2.0).with_falloff(2.0);
        assert_relative_eq!(producer.sample(Vec3::new(0.0, 0.0, 3.0)).unwrap().strength, 1.0);
        assert_relative_eq!(
            producer.sample(Vec3::new(0.0, 0.0, 4.0)).unwrap().strength,
            0.5,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_plane_outside_domain_contributes_nothing() {
        let producer = ForceProducer::surface(Shape::plane(2.0, 2.0), 0.0).with_falloff(5.0);
        assert_eq!(producer.sample(Vec3::new(4.0, 0.0, 1.0)).unwrap(), ForceSample::NONE);
        assert_eq!(producer.sample(Vec3::new(0.0, 0.0, -1.0)).unwrap(), ForceSample::NONE);

        let front = producer.sample(Vec3::new(0.0, 0.0, 1.0)).unwrap();
        assert_relative_eq!(front.strength, 0.8, epsilon = 1e-6);
        assert_relative_eq!(front.vector, Vec3::new(0.0, 0.0, -10.0));
    }

    #[test]
    fn test_zone_falloff() {
        let bounds = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let producer = ForceProducer::zone(bounds, Vec3::new(0.0, 0.0, 2.0))
            .with_strength(3.0)
            .with_falloff(2.0);

        let inside = producer.sample(Vec3::zeros()).unwrap();
        assert_relative_eq!(inside.strength, 1.0);
        assert_relative_eq!(inside.vector, Vec3::new(0.0, 0.0, 3.0));

        assert_relative_eq!(producer.sample(Vec3::new(2.0, 0.0, 0.0)).unwrap().strength, 0.5);
        assert_eq!(producer.sample(Vec3::new(4.0, 0.0, 0.0)).unwrap(), ForceSample::NONE);
        assert!(producer.in_range(Vec3::new(2.9, 0.0, 0.0)));
        assert!(!producer.in_range(Vec3::new(3.1, 0.0, 0.0)));
    }

    #[test]
    fn test_shape_zone_uses_signed_distance() {
        let producer = ForceProducer::shape_zone(Shape::cuboid(Vec3::new(1.0, 1.0, 1.0)), Vec3::x())
            .with_strength(1.0)
            .with_falloff(1.0);
        assert_relative_eq!(producer.sample(Vec3::new(0.5, 0.0, 0.0)).unwrap().strength, 1.0);
        assert_relative_eq!(producer.sample(Vec3::new(0.0, 1.25, 0.0)).unwrap().strength, 0.75);
        assert_relative_eq!(producer.force_vector(Vec3::new(50.0, 0.0, 0.0)).unwrap(), Vec3::x());
    }

    #[test]
    fn test_point_producer() {
        let producer = ForceProducer::point(Vec3::new(1.0, 0.0, 0.0), 1.0)
            .with_strength(-2.0)
            .with_falloff(1.0);

        let near = producer.sample(Vec3::new(1.0, 0.5, 0.0)).unwrap();
        assert_relative_eq!(near.strength, 1.0);
        // Negative strength attracts
        assert_relative_eq!(near.vector, Vec3::new(0.0, -2.0, 0.0));

        assert_relative_eq!(producer.sample(Vec3::new(1.0, 0.0, 1.5)).unwrap().strength, 0.5);
        assert!(!producer.in_range(Vec3::new(1.0, 0.0, 2.1)));
    }

    #[test]
    fn test_unbuilt_mesh_index_is_reported() {
        let shape = Shape::mesh_unindexed(Arc::new(TriangleMesh::cube(1.0)), MeshIndexConfig::default());
        let producer = ForceProducer::surface(shape, 0.0);
        assert_eq!(producer.sample(Vec3::zeros()), Err(ShapeError::IndexNotBuilt));
        assert_eq!(producer.force_vector(Vec3::zeros()), Err(ShapeError::IndexNotBuilt));
    }

    #[test]
    fn test_layer_matching() {
        let producer = ForceProducer::global(Vec3::y()).with_layers(LayerMask::from_layers([2, 3]));
        assert!(producer.matches_layer(None));
        assert!(producer.matches_layer(Some(3)));
        assert!(!producer.matches_layer(Some(0)));
    }

    #[test]
    fn test_validate() {
        assert!(sphere_producer().validate().is_ok());
        assert_eq!(
            sphere_producer().with_falloff(-1.0).validate(),
            Err(ProducerError::InvalidFalloff(-1.0))
        );
        assert!(matches!(
            sphere_producer().with_strength(f32::NAN).validate(),
            Err(ProducerError::InvalidStrength(_))
        ));
        assert_eq!(
            ForceProducer::global(Vec3::zeros()).validate(),
            Err(ProducerError::ZeroDirection("global"))
        );
        assert!(matches!(
            ForceProducer::point(Vec3::zeros(), -1.0).validate(),
            Err(ProducerError::InvalidRange { parameter: "radius", .. })
        ));
        assert!(matches!(
            ForceProducer::surface(Shape::sphere(-1.0), 0.0).validate(),
            Err(ProducerError::Shape(_))
        ));
    }
}
