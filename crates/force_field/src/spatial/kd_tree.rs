//! K-d tree over a static point set
//!
//! Recursively splits the point set at the median of its widest axis until
//! nodes hold at most `leaf_size` points. Supports nearest-neighbour and
//! radius queries; both return indices into the input point slice.

use crate::foundation::math::Vec3;
use crate::geometry::Aabb;

/// Configuration for k-d tree construction
#[derive(Debug, Clone, Copy)]
pub struct KdTreeConfig {
    /// Maximum points per leaf node
    pub leaf_size: usize,
}

impl Default for KdTreeConfig {
    fn default() -> Self {
        Self { leaf_size: 8 }
    }
}

/// Result of a nearest-neighbour query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the point in the tree's point set
    pub index: usize,
    /// Squared distance from the query point
    pub distance_sq: f32,
}

/// Single node of the tree
#[derive(Debug, Clone)]
enum KdNode {
    Leaf {
        indices: Vec<usize>,
    },
    Branch {
        axis: usize,
        split: f32,
        left: Box<KdNode>,
        right: Box<KdNode>,
    },
}

impl KdNode {
    fn build(points: &[Vec3], indices: &mut [usize], leaf_size: usize) -> Self {
        if indices.len() <= leaf_size {
            return Self::Leaf {
                indices: indices.to_vec(),
            };
        }

        let axis = Aabb::from_points(indices.iter().map(|&i| points[i]))
            .map_or(0, |bounds| bounds.extents().imax());

        // Points left of the median sort at or below the split value
        let mid = indices.len() / 2;
        indices.select_nth_unstable_by(mid, |&a, &b| points[a][axis].total_cmp(&points[b][axis]));
        let split = points[indices[mid]][axis];

        let (left, right) = indices.split_at_mut(mid);
        Self::Branch {
            axis,
            split,
            left: Box::new(Self::build(points, left, leaf_size)),
            right: Box::new(Self::build(points, right, leaf_size)),
        }
    }

    fn nearest(&self, points: &[Vec3], query: Vec3, best: &mut Option<Neighbor>) {
        match self {
            Self::Leaf { indices } => {
                for &index in indices {
                    let distance_sq = (points[index] - query).magnitude_squared();
                    if best.map_or(true, |b| distance_sq < b.distance_sq) {
                        *best = Some(Neighbor { index, distance_sq });
                    }
                }
            }
            Self::Branch {
                axis,
                split,
                left,
                right,
            } => {
                let diff = query[*axis] - split;
                let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };

                near.nearest(points, query, best);
                if best.map_or(true, |b| diff * diff < b.distance_sq) {
                    far.nearest(points, query, best);
                }
            }
        }
    }

    fn within_radius(&self, points: &[Vec3], query: Vec3, radius: f32, results: &mut Vec<usize>) {
        match self {
            Self::Leaf { indices } => {
                let radius_sq = radius * radius;
                results.extend(
                    indices
                        .iter()
                        .copied()
                        .filter(|&i| (points[i] - query).magnitude_squared() <= radius_sq),
                );
            }
            Self::Branch {
                axis,
                split,
                left,
                right,
            } => {
                if query[*axis] - radius <= *split {
                    left.within_radius(points, query, radius, results);
                }
                if query[*axis] + radius >= *split {
                    right.within_radius(points, query, radius, results);
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Branch { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// Balanced k-d tree over a fixed set of points
#[derive(Debug, Clone)]
pub struct KdTree {
    points: Vec<Vec3>,
    root: Option<KdNode>,
}

impl KdTree {
    /// Build a tree over `points`
    pub fn build(points: Vec<Vec3>, config: KdTreeConfig) -> Self {
        let mut indices: Vec<usize> = (0..points.len()).collect();
        let root = if points.is_empty() {
            None
        } else {
            Some(KdNode::build(&points, &mut indices, config.leaf_size.max(1)))
        };
        Self { points, root }
    }

    /// Number of points in the tree
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the tree holds no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Position of the point with the given index
    pub fn point(&self, index: usize) -> Vec3 {
        self.points[index]
    }

    /// Depth of the deepest leaf, zero for an empty tree
    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, KdNode::depth)
    }

    /// Find the point closest to `query`
    pub fn nearest(&self, query: Vec3) -> Option<Neighbor> {
        let mut best = None;
        if let Some(root) = &self.root {
            root.nearest(&self.points, query, &mut best);
        }
        best
    }

    /// Indices of every point within `radius` of `query` (inclusive)
    pub fn within_radius(&self, query: Vec3, radius: f32) -> Vec<usize> {
        let mut results = Vec::new();
        if let Some(root) = &self.root {
            root.within_radius(&self.points, query, radius, &mut results);
        }
        results
    }

    /// The nearest point plus every point within `epsilon` of the nearest distance
    ///
    /// Spatially coincident points (for example duplicated vertices along a
    /// texture seam) are all returned, nearest first.
    pub fn nearest_with_ties(&self, query: Vec3, epsilon: f32) -> Vec<usize> {
        let Some(nearest) = self.nearest(query) else {
            return Vec::new();
        };

        let radius = nearest.distance_sq.sqrt() + epsilon.max(0.0);
        let mut tied = self.within_radius(query, radius);
        tied.retain(|&i| i != nearest.index);
        tied.insert(0, nearest.index);
        tied
    }
}
