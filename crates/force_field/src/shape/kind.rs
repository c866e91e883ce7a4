//! Shape variants and their parameters

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use crate::spatial::{MeshIndexConfig, MeshSpatialIndex, TriangleMesh};

/// Local axis a capsule's medial segment runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapsuleAxis {
    /// Local X
    X,
    /// Local Y
    #[default]
    Y,
    /// Local Z
    Z,
}

impl CapsuleAxis {
    /// Component index of the axis
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// A triangle mesh together with its (possibly not yet built) spatial index
#[derive(Debug, Clone)]
pub struct MeshShape {
    mesh: Arc<TriangleMesh>,
    index: Option<MeshSpatialIndex>,
    config: MeshIndexConfig,
}

impl MeshShape {
    /// Wrap a mesh and build its index immediately
    pub fn indexed(mesh: Arc<TriangleMesh>, config: MeshIndexConfig) -> Self {
        let mut shape = Self::unindexed(mesh, config);
        shape.build_index();
        shape
    }

    /// Wrap a mesh without building the index yet
    pub fn unindexed(mesh: Arc<TriangleMesh>, config: MeshIndexConfig) -> Self {
        Self {
            mesh,
            index: None,
            config,
        }
    }

    /// Build (or rebuild) the spatial index for the current mesh
    pub fn build_index(&mut self) {
        debug!(
            "Building mesh shape index ({} triangles)",
            self.mesh.triangle_count()
        );
        match &mut self.index {
            Some(index) => index.rebuild(Arc::clone(&self.mesh)),
            None => self.index = Some(MeshSpatialIndex::build(Arc::clone(&self.mesh), self.config)),
        }
    }

    /// Replace the mesh, rebuilding the index if one existed
    pub fn set_mesh(&mut self, mesh: Arc<TriangleMesh>) {
        if Arc::ptr_eq(&self.mesh, &mesh) {
            return;
        }
        self.mesh = mesh;
        if self.index.is_some() {
            self.build_index();
        }
    }

    /// The wrapped mesh
    pub fn mesh(&self) -> &Arc<TriangleMesh> {
        &self.mesh
    }

    /// The spatial index, if built
    pub fn index(&self) -> Option<&MeshSpatialIndex> {
        self.index.as_ref()
    }

    /// Whether the spatial index has been built
    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Index configuration
    pub fn config(&self) -> &MeshIndexConfig {
        &self.config
    }
}

/// Geometric variant of a shape
///
/// All dimensions are in the shape's local frame, before scale.
#[derive(Debug, Clone)]
pub enum ShapeKind {
    /// Box with the given half extents
    Box {
        /// Half size along each local axis
        half_extents: Vec3,
    },
    /// Sphere centred on the local origin
    Sphere {
        /// Sphere radius
        radius: f32,
    },
    /// Capsule centred on the local origin
    Capsule {
        /// Radius of the caps and the cylinder
        radius: f32,
        /// Total height including both caps
        height: f32,
        /// Axis of the medial segment
        axis: CapsuleAxis,
    },
    /// Finite rectangle in the local XY plane, facing local +Z
    Plane {
        /// Size along local X
        width: f32,
        /// Size along local Y
        height: f32,
    },
    /// Arbitrary triangle mesh
    Mesh(MeshShape),
}

impl ShapeKind {
    /// Short lowercase name of the variant
    pub fn name(&self) -> &'static str {
        match self {
            Self::Box { .. } => "box",
            Self::Sphere { .. } => "sphere",
            Self::Capsule { .. } => "capsule",
            Self::Plane { .. } => "plane",
            Self::Mesh(_) => "mesh",
        }
    }
}
