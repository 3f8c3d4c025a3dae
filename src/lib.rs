//! Arcade Core - shared 2D engine substrate for the arcade titles
//!
//! Core modules:
//! - `pool`: Generational object pooling (reusable slots, no per-frame allocation)
//! - `collision`: Uniform-grid broad phase plus exact narrow-phase tests
//! - `particles`: Pool-backed particle simulation
//! - `camera`: View transform (follow, shake, zoom)
//! - `session`: Per-game context object owning all of the above
//!
//! The engine is single-threaded and synchronous: one logical thread drives
//! update then render each tick. The update pass owns the session exclusively
//! and must complete before the render pass reads it; that ordering is the
//! only guarantee callers need to uphold. Clamping a runaway `dt` after a
//! frame stall is the caller's responsibility.

pub mod camera;
pub mod collision;
pub mod error;
pub mod particles;
pub mod pool;
pub mod session;

pub use camera::{Camera, CameraConfig, CameraTransform};
pub use collision::{Aabb, SpatialGrid};
pub use error::EngineError;
pub use particles::{EmitterConfig, Particle, ParticleSystem};
pub use pool::{Growth, Handle, ObjectPool};
pub use session::{Session, SessionConfig};

use glam::Vec2;

/// Engine configuration defaults
pub mod consts {
    /// Default broad-phase cell size (world units)
    pub const DEFAULT_CELL_SIZE: f32 = 64.0;
    /// Default entity pool capacity
    pub const DEFAULT_ENTITY_CAPACITY: usize = 512;
    /// Default particle pool capacity
    pub const MAX_PARTICLES: usize = 256;

    /// Default zoom clamp range
    pub const DEFAULT_MIN_ZOOM: f32 = 0.25;
    pub const DEFAULT_MAX_ZOOM: f32 = 4.0;

    /// Default viewport dimensions (pixels)
    pub const DEFAULT_VIEWPORT_WIDTH: f32 = 800.0;
    pub const DEFAULT_VIEWPORT_HEIGHT: f32 = 600.0;
}

/// Normalize angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}

/// Linear interpolation between start and end
#[inline]
pub fn lerp(start: f32, end: f32, t: f32) -> f32 {
    start + (end - start) * t
}

/// Move current towards target by at most max_delta
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let diff = target - current;
    if diff.abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(diff)
    }
}
