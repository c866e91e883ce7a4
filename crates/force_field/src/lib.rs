//! # Force Field
//!
//! Spatial force composition for simulations: producers shaped as boxes,
//! spheres, capsules, finite planes or triangle meshes emit forces in named
//! categories, and a [`ForceField`](field::ForceField) combines them at any
//! query point.
//!
//! ## Features
//!
//! - **Closest-point geometry**: closest point, outward normal and signed
//!   distance for every shape under position, rotation and non-uniform scale
//! - **Mesh spatial index**: k-d tree over mesh vertices plus a
//!   vertex-to-triangle table for nearest-surface queries with smooth normals
//! - **Importance ordering**: override producers are alpha composited front
//!   to back so the most important full-strength field decides the result
//! - **Additive producers**: independent forces that stack on top
//! - **Categories and layers**: open category tags with mixing sets, and
//!   32-bit layer masks for receiver filtering
//!
//! ## Quick Start
//!
//! ```rust
//! use force_field::prelude::*;
//!
//! let mut field = ForceField::new();
//! field
//!     .register(
//!         ForceProducer::surface(Shape::sphere(2.0), 0.0)
//!             .with_category("gravity")
//!             .with_strength(5.0)
//!             .with_falloff(1.0),
//!     )
//!     .unwrap();
//!
//! let force = field
//!     .query_category(Vec3::new(0.0, 1.5, 0.0), &CategoryId::gravity(), None)
//!     .unwrap();
//! assert!((force - Vec3::new(0.0, -5.0, 0.0)).norm() < 1e-5);
//! ```

pub mod category;
pub mod config;
pub mod field;
pub mod foundation;
pub mod geometry;
pub mod producer;
pub mod shape;
pub mod spatial;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        category::{Category, CategoryId, CategoryTable, ForceMode},
        config::{Config, ConfigError, FieldConfig},
        field::{FieldError, FieldStats, ForceField, ProducerHandle},
        foundation::math::{Quat, Transform, Vec3},
        geometry::Aabb,
        producer::{ForceProducer, ForceSample, LayerMask, ProducerError, ProducerKind},
        shape::{CapsuleAxis, Shape, ShapeError, ShapeKind, SurfaceSample},
        spatial::{MeshIndexConfig, MeshSpatialIndex, TriangleMesh},
    };
}
