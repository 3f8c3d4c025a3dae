//! Pool-backed particle simulation
//!
//! Particles are visual-only: they never affect gameplay, and a full pool is
//! not an error. An emit that cannot place its whole burst places what fits
//! and reports the actual count, so effects degrade instead of interrupting
//! the frame loop.
//!
//! All randomness comes from a caller-supplied seedable RNG, keeping emission
//! reproducible under a fixed seed.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::polar_to_cartesian;
use crate::pool::{Growth, Handle, ObjectPool};

/// A single live particle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Remaining lifetime in seconds; monotonically decreasing.
    pub lifetime: f32,
    pub max_lifetime: f32,
    /// Current size (shrinks over life when configured to).
    pub size: f32,
    pub color: [u8; 3],
    initial_size: f32,
    gravity: f32,
    drag: f32,
    fade: bool,
    shrink: bool,
}

impl Particle {
    /// Life progress: 0 just spawned, 1 about to expire.
    #[inline]
    pub fn progress(&self) -> f32 {
        (1.0 - self.lifetime / self.max_lifetime).clamp(0.0, 1.0)
    }

    /// Render alpha in [0, 1], ramping down over life when fading.
    #[inline]
    pub fn alpha(&self) -> f32 {
        if self.fade { 1.0 - self.progress() } else { 1.0 }
    }
}

/// Emission parameters: fixed values or `(min, max)` ranges sampled per
/// particle.
///
/// Rates are per second; velocity is sampled as a speed within `speed` along
/// an angle within `angle` (radians, screen convention: +y down).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterConfig {
    pub lifetime: (f32, f32),
    pub speed: (f32, f32),
    pub angle: (f32, f32),
    pub size: (f32, f32),
    /// Candidate colors, picked uniformly per particle.
    pub colors: Vec<[u8; 3]>,
    /// Downward acceleration (negative values rise).
    pub gravity: f32,
    /// Fraction of velocity lost per second.
    pub drag: f32,
    pub fade: bool,
    pub shrink: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            lifetime: (0.5, 1.0),
            speed: (120.0, 300.0),
            angle: (0.0, std::f32::consts::TAU),
            size: (3.0, 6.0),
            colors: vec![[255, 200, 50], [255, 100, 50], [255, 50, 50]],
            gravity: 360.0,
            drag: 0.6,
            fade: true,
            shrink: true,
        }
    }
}

impl EmitterConfig {
    /// Radial burst for destroyed entities, tinted around `color`.
    pub fn explosion(color: [u8; 3]) -> Self {
        let [r, g, b] = color;
        Self {
            lifetime: (0.33, 0.66),
            speed: (180.0, 360.0),
            size: (4.0, 8.0),
            colors: vec![
                color,
                [r.saturating_add(50), g.saturating_sub(50), b.saturating_sub(50)],
                [r.saturating_sub(100), g.saturating_sub(100), b.saturating_sub(100)],
            ],
            gravity: 180.0,
            ..Self::default()
        }
    }

    /// Impact sparks, optionally spread around a direction (radians).
    pub fn sparks(direction: Option<f32>) -> Self {
        let angle = match direction {
            Some(dir) => (dir - std::f32::consts::FRAC_PI_6, dir + std::f32::consts::FRAC_PI_6),
            None => (0.0, std::f32::consts::TAU),
        };
        Self {
            lifetime: (0.17, 0.42),
            speed: (180.0, 480.0),
            angle,
            size: (2.0, 4.0),
            colors: vec![[255, 255, 100], [255, 200, 50]],
            gravity: 720.0,
            ..Self::default()
        }
    }

    /// Slow gray puffs that drift upward.
    pub fn smoke() -> Self {
        Self {
            lifetime: (0.66, 1.33),
            speed: (30.0, 120.0),
            // Upward cone in screen coordinates
            angle: (4.36, 5.06),
            size: (8.0, 15.0),
            colors: vec![[100, 100, 100], [80, 80, 80], [60, 60, 60]],
            gravity: -108.0,
            ..Self::default()
        }
    }

    /// Pickup/collect twinkle that floats up slightly.
    pub fn collect(color: [u8; 3]) -> Self {
        Self {
            lifetime: (0.33, 0.58),
            speed: (120.0, 300.0),
            size: (3.0, 6.0),
            colors: vec![color, [255, 255, 255]],
            gravity: -180.0,
            ..Self::default()
        }
    }
}

/// Sample a closed range; a degenerate range is its lower bound.
fn sample<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (f32, f32)) -> f32 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}

/// Particle lifecycle manager over a fixed-capacity [`ObjectPool`].
#[derive(Debug)]
pub struct ParticleSystem {
    pool: ObjectPool<Particle>,
    /// Scratch list of handles expiring this update, reused across frames.
    expired: Vec<Handle>,
}

impl ParticleSystem {
    /// Create a system holding at most `capacity` live particles.
    pub fn new(capacity: usize) -> Result<Self, EngineError> {
        Ok(Self {
            pool: ObjectPool::with_capacity(capacity, Growth::Fixed)?,
            expired: Vec::new(),
        })
    }

    /// Emit up to `count` particles at `origin`, sampling attributes from
    /// `config` with the supplied RNG.
    ///
    /// Returns the number actually emitted: when the pool cannot satisfy the
    /// full burst the remainder is dropped, not surfaced as an error.
    pub fn emit<R: Rng + ?Sized>(
        &mut self,
        origin: Vec2,
        count: usize,
        config: &EmitterConfig,
        rng: &mut R,
    ) -> usize {
        let mut emitted = 0;
        for _ in 0..count {
            let angle = sample(rng, config.angle);
            let speed = sample(rng, config.speed);
            let lifetime = sample(rng, config.lifetime);
            let size = sample(rng, config.size);
            let color = if config.colors.is_empty() {
                [255, 255, 255]
            } else {
                config.colors[rng.random_range(0..config.colors.len())]
            };

            let particle = Particle {
                pos: origin,
                vel: polar_to_cartesian(speed, angle),
                lifetime,
                max_lifetime: lifetime,
                size,
                color,
                initial_size: size,
                gravity: config.gravity,
                drag: config.drag,
                fade: config.fade,
                shrink: config.shrink,
            };

            if self.pool.acquire(particle).is_err() {
                log::debug!("particle pool full, emitted {emitted} of {count}");
                break;
            }
            emitted += 1;
        }
        emitted
    }

    /// Advance every live particle and release the ones that expire.
    ///
    /// A particle whose lifetime reaches zero is returned to the pool within
    /// this same call; its slot is immediately reusable.
    pub fn update(&mut self, dt: f32) {
        self.expired.clear();
        for (handle, p) in self.pool.iter_active_mut() {
            p.pos += p.vel * dt;
            p.vel.y += p.gravity * dt;
            p.vel *= (1.0 - p.drag * dt).max(0.0);
            p.lifetime -= dt;
            if p.shrink {
                p.size = p.initial_size * (p.lifetime / p.max_lifetime).max(0.0);
            }
            if p.lifetime <= 0.0 {
                self.expired.push(handle);
            }
        }
        for &handle in &self.expired {
            self.pool.release(handle);
        }
    }

    /// Live particles for rendering, in stable slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.pool.iter_active().map(|(_, p)| p)
    }

    /// Number of live particles.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.pool.active_count()
    }

    /// Pool capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Drop every live particle.
    pub fn clear(&mut self) {
        self.pool.clear();
    }
}
