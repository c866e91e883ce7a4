//! Nearest-surface-point acceleration for triangle meshes
//!
//! The index owns a k-d tree over the mesh vertices and a vertex→triangle
//! table. A query finds the nearest vertex (plus any vertices tied with it
//! within a small epsilon), runs the triangle closest-point test on every
//! triangle touching those vertices, and keeps the best hit.
//!
//! Restricting candidates to triangles around the nearest vertices is exact
//! for convex meshes. On concave meshes the true nearest point can lie on a
//! triangle whose vertices are all farther away than some other vertex, in
//! which case the result is a close local approximation rather than the
//! global nearest point.
//!
//! All positions are in the mesh's local frame. The index is built from
//! topology alone and never depends on where the mesh is placed.

use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::foundation::math::{normalize_or_zero, Vec3};
use crate::geometry::TrianglePoint;
use crate::spatial::kd_tree::{KdTree, KdTreeConfig};
use crate::spatial::mesh::{MeshError, TriangleMesh};

/// Rejected [`MeshIndexConfig`] values
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum MeshIndexConfigError {
    /// The tie epsilon is negative or not finite
    #[error("coincident_epsilon must be finite and non-negative, got {0}")]
    CoincidentEpsilon(f32),

    /// Leaves must hold at least one vertex
    #[error("leaf_size must be at least 1")]
    ZeroLeafSize,
}

/// Tuning for mesh index construction and queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshIndexConfig {
    /// Vertices within this distance of the nearest distance count as tied
    pub coincident_epsilon: f32,

    /// Maximum vertices per k-d tree leaf
    pub leaf_size: usize,
}

impl Default for MeshIndexConfig {
    fn default() -> Self {
        Self {
            coincident_epsilon: 1e-4,
            leaf_size: 8,
        }
    }
}

impl MeshIndexConfig {
    /// Set the tie epsilon
    #[must_use]
    pub fn with_coincident_epsilon(mut self, epsilon: f32) -> Self {
        self.coincident_epsilon = epsilon;
        self
    }

    /// Set the leaf size
    #[must_use]
    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), MeshIndexConfigError> {
        if !self.coincident_epsilon.is_finite() || self.coincident_epsilon < 0.0 {
            return Err(MeshIndexConfigError::CoincidentEpsilon(self.coincident_epsilon));
        }
        if self.leaf_size == 0 {
            return Err(MeshIndexConfigError::ZeroLeafSize);
        }
        Ok(())
    }
}

/// Triangles incident to each vertex, stored as offsets into one flat list
#[derive(Debug, Clone, Default)]
pub struct VertexTriangleTable {
    offsets: Vec<usize>,
    triangles: Vec<u32>,
}

impl VertexTriangleTable {
    /// Build the table for `vertex_count` vertices
    pub fn build(vertex_count: usize, triangles: &[[u32; 3]]) -> Self {
        let mut counts = vec![0usize; vertex_count + 1];
        for corners in triangles {
            for &v in corners {
                counts[v as usize + 1] += 1;
            }
        }
        for i in 1..counts.len() {
            counts[i] += counts[i - 1];
        }

        let offsets = counts;
        let mut cursor = offsets.clone();
        let mut flat = vec![0u32; offsets[vertex_count]];
        for (t, corners) in triangles.iter().enumerate() {
            for &v in corners {
                let slot = &mut cursor[v as usize];
                flat[*slot] = t as u32;
                *slot += 1;
            }
        }

        Self {
            offsets,
            triangles: flat,
        }
    }

    /// Triangles that reference `vertex`
    pub fn triangles_of(&self, vertex: usize) -> &[u32] {
        match (self.offsets.get(vertex), self.offsets.get(vertex + 1)) {
            (Some(&start), Some(&end)) => &self.triangles[start..end],
            _ => &[],
        }
    }

    /// Number of vertices covered by the table
    pub fn vertex_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }
}

/// Nearest point on a mesh surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshSurfacePoint {
    /// Closest point on the surface
    pub point: Vec3,
    /// Barycentric blend of the winning triangle's vertex normals
    pub normal: Vec3,
    /// Index of the winning triangle
    pub triangle: usize,
    /// Squared distance from the query point
    pub distance_sq: f32,
}

/// Spatial index answering nearest-surface-point queries on one mesh
#[derive(Debug, Clone)]
pub struct MeshSpatialIndex {
    mesh: Arc<TriangleMesh>,
    tree: KdTree,
    /// Maps k-d tree point indices back to mesh vertex indices
    tree_vertices: Vec<u32>,
    table: VertexTriangleTable,
    config: MeshIndexConfig,
}

impl MeshSpatialIndex {
    /// Build an index over a validated mesh
    pub fn build(mesh: Arc<TriangleMesh>, config: MeshIndexConfig) -> Self {
        let table = VertexTriangleTable::build(mesh.vertex_count(), mesh.triangles());

        // Vertices no triangle uses would yield no candidates, keep them out
        let tree_vertices: Vec<u32> = (0..mesh.vertex_count())
            .filter(|&v| !table.triangles_of(v).is_empty())
            .map(|v| v as u32)
            .collect();
        let unused = mesh.vertex_count() - tree_vertices.len();
        if unused > 0 {
            warn!("Mesh has {unused} vertices not referenced by any triangle");
        }

        let points = tree_vertices
            .iter()
            .map(|&v| mesh.vertices()[v as usize])
            .collect();
        let tree = KdTree::build(
            points,
            KdTreeConfig {
                leaf_size: config.leaf_size,
            },
        );

        debug!(
            "Built mesh index: {} vertices, {} triangles, tree depth {}",
            tree.len(),
            mesh.triangle_count(),
            tree.depth()
        );

        Self {
            mesh,
            tree,
            tree_vertices,
            table,
            config,
        }
    }

    /// Validate raw buffers and build an index over them
    ///
    /// `normals` may be empty, in which case area-weighted normals are used.
    pub fn from_buffers(
        vertices: Vec<Vec3>,
        indices: &[u32],
        normals: Vec<Vec3>,
        config: MeshIndexConfig,
    ) -> Result<Self, MeshError> {
        let mesh = TriangleMesh::new(vertices, indices, normals)?;
        Ok(Self::build(Arc::new(mesh), config))
    }

    /// Replace the indexed mesh, rebuilding the tree and the table
    pub fn rebuild(&mut self, mesh: Arc<TriangleMesh>) {
        *self = Self::build(mesh, self.config);
    }

    /// The indexed mesh
    pub fn mesh(&self) -> &Arc<TriangleMesh> {
        &self.mesh
    }

    /// Configuration the index was built with
    pub fn config(&self) -> &MeshIndexConfig {
        &self.config
    }

    /// Vertex→triangle table
    pub fn vertex_triangles(&self) -> &VertexTriangleTable {
        &self.table
    }

    /// Mesh vertices tied for nearest to `point`
    pub fn nearest_vertices(&self, point: Vec3) -> Vec<usize> {
        self.tree
            .nearest_with_ties(point, self.config.coincident_epsilon)
            .into_iter()
            .map(|i| self.tree_vertices[i] as usize)
            .collect()
    }

    /// Closest point on the mesh surface to a local-space point
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        self.closest_point_with_normal(point).point
    }

    /// Closest surface point with its smoothed normal
    pub fn closest_point_with_normal(&self, point: Vec3) -> MeshSurfacePoint {
        let mut candidates: Vec<u32> = self
            .nearest_vertices(point)
            .into_iter()
            .flat_map(|v| self.table.triangles_of(v).iter().copied())
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        let mut best: Option<(usize, TrianglePoint, f32)> = None;
        for triangle in candidates {
            let triangle = triangle as usize;
            let hit = self.mesh.triangle(triangle).closest_point(point);
            let distance_sq = (hit.point - point).magnitude_squared();
            if best.map_or(true, |(_, _, d)| distance_sq < d) {
                best = Some((triangle, hit, distance_sq));
            }
        }

        // Every indexed vertex has at least one triangle
        let (triangle, hit, distance_sq) = best.unwrap_or_else(|| {
            let hit = self.mesh.triangle(0).closest_point(point);
            (0, hit, (hit.point - point).magnitude_squared())
        });

        let [n0, n1, n2] = self.mesh.triangle_normals(triangle);
        let mut normal = normalize_or_zero(hit.interpolate(n0, n1, n2));
        if normal == Vec3::zeros() {
            normal = self.mesh.triangle(triangle).normal();
        }

        MeshSurfacePoint {
            point: hit.point,
            normal,
            triangle,
            distance_sq,
        }
    }

    /// Signed distance to the surface, negative behind the surface normal
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        let surface = self.closest_point_with_normal(point);
        let distance = surface.distance_sq.sqrt();
        if surface.normal.dot(&(point - surface.point)) >= 0.0 {
            distance
        } else {
            -distance
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn sphere_index() -> MeshSpatialIndex {
        MeshSpatialIndex::build(
            Arc::new(TriangleMesh::uv_sphere(1.0, 32, 16)),
            MeshIndexConfig::default(),
        )
    }

    #[test]
    fn test_vertex_triangle_table() {
        let triangles = [[0, 1, 2], [0, 2, 3], [3, 2, 4]];
        let table = VertexTriangleTable::build(6, &triangles);

        assert_eq!(table.vertex_count(), 6);
        assert_eq!(table.triangles_of(0), &[0, 1]);
        assert_eq!(table.triangles_of(2), &[0, 1, 2]);
        assert_eq!(table.triangles_of(4), &[2]);
        assert!(table.triangles_of(5).is_empty());
        assert!(table.triangles_of(42).is_empty());
    }

    #[test]
    fn test_cube_closest_point_and_sign() {
        let index = MeshSpatialIndex::build(
            Arc::new(TriangleMesh::cube(1.0)),
            MeshIndexConfig::default(),
        );

        let outside = index.closest_point_with_normal(Vec3::new(0.9, 0.8, 3.0));
        assert_relative_eq!(outside.point, Vec3::new(0.9, 0.8, 1.0), epsilon = 1e-5);
        assert_relative_eq!(index.signed_distance(Vec3::new(0.9, 0.8, 3.0)), 2.0, epsilon = 1e-5);

        assert!(index.signed_distance(Vec3::new(0.9, 0.9, 0.8)) < 0.0);
    }

    #[test]
    fn test_surface_points_round_trip() {
        let index = sphere_index();
        let mesh = index.mesh().clone();

        for t in (0..mesh.triangle_count()).step_by(7) {
            let tri = mesh.triangle(t);
            let on_surface = tri.centroid();

            let hit = index.closest_point_with_normal(on_surface);
            assert_relative_eq!(hit.point, on_surface, epsilon = 1e-5);

            // Smoothed normal stays within a few degrees of the face normal
            let cos_angle = hit.normal.dot(&tri.normal());
            assert!(cos_angle > 0.99, "triangle {t}: cos angle {cos_angle}");
        }
    }

    #[test]
    fn test_signed_distance_matches_sphere() {
        let index = sphere_index();

        let outside = index.signed_distance(Vec3::new(0.3, 2.5, -0.4));
        let expected = Vec3::new(0.3, 2.5, -0.4).magnitude() - 1.0;
        assert_abs_diff_eq!(outside, expected, epsilon = 0.02);

        let inside = index.signed_distance(Vec3::new(0.1, -0.2, 0.3));
        assert!(inside < 0.0);
    }

    #[test]
    fn test_seam_vertices_are_tied() {
        let index = sphere_index();
        // The UV sphere duplicates its seam column at theta = 0
        let seam_point = Vec3::new(1.0, 0.0, 0.0);
        assert!(index.nearest_vertices(seam_point * 1.5).len() >= 2);
    }

    #[test]
    fn test_rebuild_replaces_mesh() {
        let mut index = sphere_index();
        index.rebuild(Arc::new(TriangleMesh::cube(2.0)));

        assert_eq!(index.mesh().triangle_count(), 12);
        assert_relative_eq!(index.signed_distance(Vec3::new(0.0, 5.0, 0.0)), 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_from_buffers_rejects_bad_indices() {
        let result = MeshSpatialIndex::from_buffers(
            vec![Vec3::zeros(), Vec3::x(), Vec3::y()],
            &[0, 1, 2, 3],
            Vec::new(),
            MeshIndexConfig::default(),
        );
        assert_eq!(result.err(), Some(MeshError::IndexCount(4)));
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(MeshIndexConfig::default().validate(), Ok(()));
        assert_eq!(
            MeshIndexConfig::default().with_leaf_size(0).validate(),
            Err(MeshIndexConfigError::ZeroLeafSize)
        );
        assert_eq!(
            MeshIndexConfig::default().with_coincident_epsilon(-1.0).validate(),
            Err(MeshIndexConfigError::CoincidentEpsilon(-1.0))
        );
        assert!(MeshIndexConfig::default()
            .with_coincident_epsilon(f32::NAN)
            .validate()
            .is_err());
    }
}
