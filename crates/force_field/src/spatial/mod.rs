//! Spatial indexing for mesh surface queries

pub mod kd_tree;
pub mod mesh;
pub mod mesh_index;

pub use kd_tree::{KdTree, KdTreeConfig, Neighbor};
pub use mesh::{MeshError, TriangleMesh};
pub use mesh_index::{
    MeshIndexConfig, MeshIndexConfigError, MeshSpatialIndex, MeshSurfacePoint, VertexTriangleTable,
};
