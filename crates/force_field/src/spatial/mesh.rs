//! Static triangle mesh data
//!
//! Holds vertex positions, a triangle list and optional per-vertex normals
//! in the mesh's own (unscaled) local frame.

use thiserror::Error;

use crate::foundation::math::{normalize_or_zero, Vec3};
use crate::geometry::Triangle;

/// Errors produced while validating mesh data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// The mesh has no vertices or no triangles
    #[error("mesh has no {0}")]
    Empty(&'static str),

    /// The flat index buffer cannot be split into triangles
    #[error("index buffer length {0} is not a multiple of 3")]
    IndexCount(usize),

    /// A triangle references a vertex that does not exist
    #[error("triangle {triangle} references vertex {index}, but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending triangle
        triangle: usize,
        /// Offending vertex index
        index: u32,
        /// Number of vertices in the mesh
        vertex_count: usize,
    },

    /// Normals were supplied but not one per vertex
    #[error("expected {vertices} normals, got {normals}")]
    NormalCount {
        /// Number of vertices in the mesh
        vertices: usize,
        /// Number of normals supplied
        normals: usize,
    },

    /// A vertex or normal contains NaN or infinity
    #[error("mesh contains a non-finite {0}")]
    NonFinite(&'static str),

    /// Every vertex sits at the same position
    #[error("mesh has zero extent")]
    Degenerate,
}

/// Triangle mesh in its local frame
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    normals: Vec<Vec3>,
}

impl TriangleMesh {
    /// Create a mesh from vertex positions and a flat index buffer
    ///
    /// `normals` may be empty, in which case area-weighted vertex normals
    /// are computed from the triangles.
    pub fn new(vertices: Vec<Vec3>, indices: &[u32], normals: Vec<Vec3>) -> Result<Self, MeshError> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::IndexCount(indices.len()));
        }
        let triangles = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Self::from_triangles(vertices, triangles, normals)
    }

    /// Create a mesh from vertex positions and indexed triangles
    pub fn from_triangles(
        vertices: Vec<Vec3>,
        triangles: Vec<[u32; 3]>,
        normals: Vec<Vec3>,
    ) -> Result<Self, MeshError> {
        if vertices.is_empty() {
            return Err(MeshError::Empty("vertices"));
        }
        if triangles.is_empty() {
            return Err(MeshError::Empty("triangles"));
        }
        if vertices.iter().any(|v| !v.iter().all(|c| c.is_finite())) {
            return Err(MeshError::NonFinite("vertex"));
        }

        let vertex_count = vertices.len();
        for (triangle, corners) in triangles.iter().enumerate() {
            if let Some(&index) = corners.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshError::IndexOutOfRange {
                    triangle,
                    index,
                    vertex_count,
                });
            }
        }

        let mut mesh = Self {
            vertices,
            triangles,
            normals,
        };

        if mesh.normals.is_empty() {
            mesh.normals = mesh.area_weighted_normals();
        } else if mesh.normals.len() != vertex_count {
            return Err(MeshError::NormalCount {
                vertices: vertex_count,
                normals: mesh.normals.len(),
            });
        } else if mesh.normals.iter().any(|n| !n.iter().all(|c| c.is_finite())) {
            return Err(MeshError::NonFinite("normal"));
        }

        Ok(mesh)
    }

    /// Check that the mesh still describes a usable surface
    ///
    /// Generated meshes skip the checks of [`TriangleMesh::from_triangles`],
    /// so shapes re-run them before a mesh takes part in queries.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.vertices.is_empty() {
            return Err(MeshError::Empty("vertices"));
        }
        if self.triangles.is_empty() {
            return Err(MeshError::Empty("triangles"));
        }
        if self.vertices.iter().any(|v| !v.iter().all(|c| c.is_finite())) {
            return Err(MeshError::NonFinite("vertex"));
        }
        if self.normals.iter().any(|n| !n.iter().all(|c| c.is_finite())) {
            return Err(MeshError::NonFinite("normal"));
        }
        let first = self.vertices[0];
        if self.vertices.iter().all(|v| *v == first) {
            return Err(MeshError::Degenerate);
        }
        Ok(())
    }

    /// Vertex positions
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Indexed triangles
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Per-vertex normals, one per vertex
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Geometry of triangle `index`
    pub fn triangle(&self, index: usize) -> Triangle {
        let [a, b, c] = self.triangles[index];
        Triangle::new(
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        )
    }

    /// The three vertex normals of triangle `index`
    pub fn triangle_normals(&self, index: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.normals[a as usize],
            self.normals[b as usize],
            self.normals[c as usize],
        ]
    }

    /// Recompute vertex normals from triangle geometry (area-weighted)
    ///
    /// Each triangle's face normal, weighted by its area, is accumulated at
    /// each of its vertices and the sums are normalized.
    pub fn area_weighted_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::zeros(); self.vertices.len()];
        for index in 0..self.triangles.len() {
            // Magnitude is twice the triangle area
            let weighted = self.triangle(index).scaled_normal();
            for &corner in &self.triangles[index] {
                normals[corner as usize] += weighted;
            }
        }
        normals.into_iter().map(normalize_or_zero).collect()
    }

    /// Axis-aligned cube centred on the origin with outward winding
    pub fn cube(half_extent: f32) -> Self {
        let h = half_extent.abs();
        let vertices = vec![
            Vec3::new(-h, -h, -h),
            Vec3::new(h, -h, -h),
            Vec3::new(h, h, -h),
            Vec3::new(-h, h, -h),
            Vec3::new(-h, -h, h),
            Vec3::new(h, -h, h),
            Vec3::new(h, h, h),
            Vec3::new(-h, h, h),
        ];
        let triangles = vec![
            // -Z
            [0, 2, 1], [0, 3, 2],
            // +Z
            [4, 5, 6], [4, 6, 7],
            // -Y
            [0, 1, 5], [0, 5, 4],
            // +Y
            [3, 7, 6], [3, 6, 2],
            // -X
            [0, 4, 7], [0, 7, 3],
            // +X
            [1, 2, 6], [1, 6, 5],
        ];
        let mut mesh = Self {
            vertices,
            triangles,
            normals: Vec::new(),
        };
        mesh.normals = mesh.area_weighted_normals();
        mesh
    }

    /// Latitude/longitude sphere centred on the origin with radial normals
    ///
    /// The seam column at longitude zero is duplicated and each pole is a
    /// ring of coincident vertices, as exported by most modelling tools.
    pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let radius = radius.abs();

        let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
        let mut normals = Vec::with_capacity(vertices.capacity());
        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            for segment in 0..=segments {
                let theta = std::f32::consts::TAU * segment as f32 / segments as f32;
                let normal = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                vertices.push(normal * radius);
                normals.push(normal);
            }
        }

        let stride = segments + 1;
        let mut triangles = Vec::new();
        for ring in 0..rings {
            for segment in 0..segments {
                let a = ring * stride + segment;
                let b = a + stride;
                // Skip the zero-area halves touching the poles
                if ring != 0 {
                    triangles.push([a, a + 1, b]);
                }
                if ring != rings - 1 {
                    triangles.push([a + 1, b + 1, b]);
                }
            }
        }

        Self {
            vertices,
            triangles,
            normals,
        }
    }
}
