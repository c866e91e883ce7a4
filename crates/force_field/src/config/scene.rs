//! Scene descriptions
//!
//! A [`FieldConfig`] lists categories and producers in a serialisable form
//! and builds a ready [`ForceField`] from them. Vectors are written as
//! three-element arrays (`[x, y, z]` in TOML, `(x, y, z)` in RON) and
//! rotations as XYZ Euler angles in degrees.

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::category::{Category, CategoryId, CategoryTable, ForceMode};
use crate::field::ForceField;
use crate::foundation::math::{utils::deg_to_rad, Quat, Transform, Vec3};
use crate::geometry::Aabb;
use crate::producer::{ForceProducer, LayerMask, ProducerKind, MAX_LAYER};
use crate::shape::{CapsuleAxis, Shape};
use crate::spatial::{MeshIndexConfig, TriangleMesh};

fn vec3(v: [f32; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

/// Generated meshes need a finite, strictly positive size
fn positive_size(what: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidScene(format!("{what} must be finite and positive, got {value}")))
    }
}

/// Position, rotation and scale of a shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformDescriptor {
    /// World position
    pub position: [f32; 3],
    /// XYZ Euler angles in degrees
    pub rotation: [f32; 3],
    /// Per-axis scale
    pub scale: [f32; 3],
}

impl Default for TransformDescriptor {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl TransformDescriptor {
    /// Runtime transform
    pub fn to_transform(&self) -> Transform {
        let [x, y, z] = self.rotation;
        Transform::new(
            vec3(self.position),
            Quat::from_euler_angles(deg_to_rad(x), deg_to_rad(y), deg_to_rad(z)),
            vec3(self.scale),
        )
    }
}

/// Shape geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeDescriptor {
    /// Box with half extents
    Box {
        /// Half size per axis
        half_extents: [f32; 3],
    },
    /// Sphere
    Sphere {
        /// Radius
        radius: f32,
    },
    /// Capsule
    Capsule {
        /// Radius
        radius: f32,
        /// Total height including caps
        height: f32,
        /// Axis of the medial segment
        #[serde(default)]
        axis: CapsuleAxis,
    },
    /// Finite plane facing local +Z
    Plane {
        /// Size along local X
        width: f32,
        /// Size along local Y
        height: f32,
    },
    /// Generated cube mesh
    Cube {
        /// Half size of the cube
        half_extent: f32,
    },
    /// Generated latitude/longitude sphere mesh
    UvSphere {
        /// Radius
        radius: f32,
        /// Divisions around the equator
        segments: u32,
        /// Divisions from pole to pole
        rings: u32,
    },
    /// Inline triangle mesh
    Mesh {
        /// Vertex positions
        vertices: Vec<[f32; 3]>,
        /// Triangle vertex indices, three per triangle
        indices: Vec<u32>,
        /// Per-vertex normals; computed from the faces when empty
        #[serde(default)]
        normals: Vec<[f32; 3]>,
    },
}

impl ShapeDescriptor {
    /// Runtime shape placed at `transform`
    pub fn to_shape(&self, transform: &TransformDescriptor, mesh_index: MeshIndexConfig) -> Result<Shape, ConfigError> {
        let shape = match self {
            Self::Box { half_extents } => Shape::cuboid(vec3(*half_extents)),
            Self::Sphere { radius } => Shape::sphere(*radius),
            Self::Capsule { radius, height, axis } => Shape::capsule(*radius, *height, *axis),
            Self::Plane { width, height } => Shape::plane(*width, *height),
            Self::Cube { half_extent } => {
                positive_size("cube half_extent", *half_extent)?;
                Shape::mesh(Arc::new(TriangleMesh::cube(*half_extent)), mesh_index)
            }
            Self::UvSphere {
                radius,
                segments,
                rings,
            } => {
                positive_size("uv_sphere radius", *radius)?;
                Shape::mesh(Arc::new(TriangleMesh::uv_sphere(*radius, *segments, *rings)), mesh_index)
            }
            Self::Mesh {
                vertices,
                indices,
                normals,
            } => {
                let mesh = TriangleMesh::new(
                    vertices.iter().copied().map(vec3).collect(),
                    indices,
                    normals.iter().copied().map(vec3).collect(),
                )
                .map_err(|e| ConfigError::InvalidScene(e.to_string()))?;
                Shape::mesh(Arc::new(mesh), mesh_index)
            }
        };
        Ok(shape.with_transform(transform.to_transform()))
    }
}

/// Producer geometry and direction policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerKindDescriptor {
    /// Unbounded fixed direction
    Global {
        /// Force direction
        direction: [f32; 3],
    },
    /// Fixed direction inside an axis-aligned box
    Zone {
        /// Minimum corner
        min: [f32; 3],
        /// Maximum corner
        max: [f32; 3],
        /// Force direction
        direction: [f32; 3],
    },
    /// Fixed direction inside a shape
    ShapeZone {
        /// Region shape
        shape: ShapeDescriptor,
        /// Shape placement
        #[serde(default)]
        transform: TransformDescriptor,
        /// Force direction
        direction: [f32; 3],
    },
    /// Pull toward a shape's surface
    Surface {
        /// Attracting shape
        shape: ShapeDescriptor,
        /// Shape placement
        #[serde(default)]
        transform: TransformDescriptor,
        /// Full-strength distance from the surface
        #[serde(default)]
        range: f32,
    },
    /// Push away from a point
    Point {
        /// Centre
        center: [f32; 3],
        /// Full-strength radius
        #[serde(default)]
        radius: f32,
    },
}

impl ProducerKindDescriptor {
    /// Runtime producer kind
    pub fn to_kind(&self, mesh_index: MeshIndexConfig) -> Result<ProducerKind, ConfigError> {
        Ok(match self {
            Self::Global { direction } => ProducerKind::Global {
                direction: vec3(*direction),
            },
            Self::Zone { min, max, direction } => ProducerKind::Zone {
                bounds: Aabb::new(vec3(*min), vec3(*max)),
                direction: vec3(*direction),
            },
            Self::ShapeZone {
                shape,
                transform,
                direction,
            } => ProducerKind::ShapeZone {
                shape: shape.to_shape(transform, mesh_index)?,
                direction: vec3(*direction),
            },
            Self::Surface {
                shape,
                transform,
                range,
            } => ProducerKind::Surface {
                shape: shape.to_shape(transform, mesh_index)?,
                range: *range,
            },
            Self::Point { center, radius } => ProducerKind::Point {
                center: vec3(*center),
                radius: *radius,
            },
        })
    }
}

fn default_category() -> CategoryId {
    CategoryId::generic()
}

const fn default_strength() -> f32 {
    10.0
}

const fn default_importance() -> i32 {
    1
}

const fn default_enabled() -> bool {
    true
}

/// A producer as written in a scene file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerDescriptor {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Geometry and direction policy
    pub kind: ProducerKindDescriptor,
    /// Category
    #[serde(default = "default_category")]
    pub category: CategoryId,
    /// Force magnitude at full coverage
    #[serde(default = "default_strength")]
    pub strength: f32,
    /// Falloff distance
    #[serde(default)]
    pub falloff: f32,
    /// Override precedence
    #[serde(default = "default_importance")]
    pub importance: i32,
    /// Additive instead of override mode
    #[serde(default)]
    pub additive: bool,
    /// Negate the direction
    #[serde(default)]
    pub invert: bool,
    /// Whether the producer contributes
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Layer ids the producer acts on; every layer when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<u8>>,
}

impl ProducerDescriptor {
    /// Runtime producer
    pub fn to_producer(&self, mesh_index: MeshIndexConfig) -> Result<ForceProducer, ConfigError> {
        let layers = match &self.layers {
            None => LayerMask::ALL,
            Some(ids) => {
                if let Some(bad) = ids.iter().find(|&&id| id > MAX_LAYER) {
                    return Err(ConfigError::InvalidScene(format!(
                        "producer '{}': layer {bad} is above {MAX_LAYER}",
                        self.name
                    )));
                }
                LayerMask::from_layers(ids.iter().copied())
            }
        };

        Ok(ForceProducer::new(self.kind.to_kind(mesh_index)?)
            .with_name(self.name.clone())
            .with_category(self.category.clone())
            .with_strength(self.strength)
            .with_falloff(self.falloff)
            .with_importance(self.importance)
            .with_additive(self.additive)
            .with_invert(self.invert)
            .with_enabled(self.enabled)
            .with_layers(layers))
    }
}

/// A category as written in a scene file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDescriptor {
    /// Category name
    pub name: CategoryId,
    /// Other categories blended into queries for this one
    #[serde(default)]
    pub mixes_with: Vec<CategoryId>,
    /// Force mode hint
    #[serde(default)]
    pub mode: ForceMode,
}

impl CategoryDescriptor {
    /// Runtime category
    pub fn to_category(&self) -> Category {
        Category::new(self.name.clone(), self.mode).with_mixes(self.mixes_with.iter().cloned())
    }
}

/// Top-level scene configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Default log filter for binaries loading this scene
    pub log_level: String,
    /// Spatial index settings for mesh shapes
    pub mesh_index: MeshIndexConfig,
    /// Categories added to (or replacing) the built-in ones
    pub categories: Vec<CategoryDescriptor>,
    /// Producers to register
    pub producers: Vec<ProducerDescriptor>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            mesh_index: MeshIndexConfig::default(),
            categories: Vec::new(),
            producers: Vec::new(),
        }
    }
}

impl Config for FieldConfig {}

impl FieldConfig {
    /// Category table: the built-in categories overlaid with this scene's
    pub fn category_table(&self) -> CategoryTable {
        let mut table = CategoryTable::with_defaults();
        for descriptor in &self.categories {
            table.insert(descriptor.to_category());
        }
        table
    }

    /// Build a field with every producer registered
    pub fn build_field(&self) -> Result<ForceField, ConfigError> {
        self.mesh_index
            .validate()
            .map_err(|reason| ConfigError::InvalidScene(format!("mesh_index: {reason}")))?;

        let mut field = ForceField::with_categories(self.category_table());
        for (i, descriptor) in self.producers.iter().enumerate() {
            let producer = descriptor.to_producer(self.mesh_index)?;
            field.register(producer).map_err(|e| {
                ConfigError::InvalidScene(format!("producer {i} ('{}'): {e}", descriptor.name))
            })?;
        }
        debug!(
            "Built force field with {} producers and {} categories",
            field.len(),
            field.categories().len()
        );
        Ok(field)
    }
}
