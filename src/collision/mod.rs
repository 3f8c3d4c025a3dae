//! Collision detection: uniform-grid broad phase and exact narrow phase
//!
//! The broad phase ([`SpatialGrid`]) replaces the per-game nested-loop scans
//! with bucket lookups keyed by quantized cell coordinates. It only produces
//! candidate pairs: callers must confirm each candidate with the matching
//! narrow-phase test ([`narrow`]) for the entity's actual shape before
//! treating it as a collision.

pub mod aabb;
pub mod grid;
pub mod narrow;

pub use aabb::Aabb;
pub use grid::SpatialGrid;
pub use narrow::{aabb_aabb, circle_aabb, circle_circle, point_in_aabb, point_in_circle};
