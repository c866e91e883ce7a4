//! Geometry primitives
//!
//! Closed-form surface queries for the primitive shapes, the triangle
//! closest-point routine used by mesh queries, and axis-aligned bounds.

pub mod aabb;
pub mod primitives;
pub mod triangle;

pub use aabb::Aabb;
pub use primitives::LocalHit;
pub use triangle::{Triangle, TrianglePoint};
