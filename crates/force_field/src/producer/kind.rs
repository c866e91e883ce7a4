//! Producer variants

use crate::foundation::math::Vec3;
use crate::geometry::Aabb;
use crate::shape::Shape;

/// Geometry and direction policy of a force producer
#[derive(Debug, Clone)]
pub enum ProducerKind {
    /// Fixed direction everywhere, strength 1 at every point
    Global {
        /// Force direction, normalised on evaluation
        direction: Vec3,
    },

    /// Fixed direction inside an axis-aligned world box
    ///
    /// Strength is 1 inside the box and decays linearly to 0 at the box
    /// grown by the producer's falloff.
    Zone {
        /// Full-strength region
        bounds: Aabb,
        /// Force direction, normalised on evaluation
        direction: Vec3,
    },

    /// Fixed direction, falloff driven by a shape's signed distance
    ShapeZone {
        /// Full-strength region
        shape: Shape,
        /// Force direction, normalised on evaluation
        direction: Vec3,
    },

    /// Pulls toward a shape's surface along the negated outward normal
    Surface {
        /// Attracting surface
        shape: Shape,
        /// Signed distance up to which strength stays at 1
        range: f32,
    },

    /// Pushes radially away from a centre; a negative producer strength
    /// attracts instead
    Point {
        /// World-space centre
        center: Vec3,
        /// Distance from the centre up to which strength stays at 1
        radius: f32,
    },
}

impl ProducerKind {
    /// Short lowercase name of the variant
    pub fn name(&self) -> &'static str {
        match self {
            Self::Global { .. } => "global",
            Self::Zone { .. } => "zone",
            Self::ShapeZone { .. } => "shape_zone",
            Self::Surface { .. } => "surface",
            Self::Point { .. } => "point",
        }
    }

    /// The shape this producer evaluates against, if any
    pub fn shape(&self) -> Option<&Shape> {
        match self {
            Self::ShapeZone { shape, .. } | Self::Surface { shape, .. } => Some(shape),
            _ => None,
        }
    }

    /// Mutable access to the producer's shape, if any
    pub fn shape_mut(&mut self) -> Option<&mut Shape> {
        match self {
            Self::ShapeZone { shape, .. } | Self::Surface { shape, .. } => Some(shape),
            _ => None,
        }
    }

    /// The fixed direction of directional variants
    pub fn direction(&self) -> Option<Vec3> {
        match self {
            Self::Global { direction }
            | Self::Zone { direction, .. }
            | Self::ShapeZone { direction, .. } => Some(*direction),
            _ => None,
        }
    }
}
