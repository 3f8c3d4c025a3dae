//! Per-game engine session
//!
//! One [`Session`] is created when a game starts and dropped when it ends; it
//! replaces the module-level singletons of older engine iterations and is
//! passed explicitly to every engine call. It owns the entity pool, the
//! broad-phase grid, the particle system, the camera and the seeded RNG, so
//! a whole run is reproducible from `SessionConfig::seed`.
//!
//! The entity payload type `T` is opaque: the engine never inspects it.
//! Spatial data lives in the grid, keyed by handle.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, CameraConfig, CameraTransform};
use crate::collision::{Aabb, SpatialGrid};
use crate::consts;
use crate::error::EngineError;
use crate::particles::{EmitterConfig, Particle, ParticleSystem};
use crate::pool::{Growth, Handle, ObjectPool};

/// Session construction parameters.
///
/// Every field is validated by the subsystem it configures; a bad value
/// fails [`Session::new`] immediately rather than being defaulted away.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seed for every random decision the engine makes (particle sampling,
    /// shake direction). Fixed seed, fixed run.
    pub seed: u64,
    pub entity_capacity: usize,
    pub entity_growth: Growth,
    pub particle_capacity: usize,
    /// Broad-phase cell size in world units.
    pub cell_size: f32,
    pub camera: CameraConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            entity_capacity: consts::DEFAULT_ENTITY_CAPACITY,
            entity_growth: Growth::OnDemand,
            particle_capacity: consts::MAX_PARTICLES,
            cell_size: consts::DEFAULT_CELL_SIZE,
            camera: CameraConfig::default(),
        }
    }
}

/// The engine context handed to per-game logic.
#[derive(Debug)]
pub struct Session<T> {
    entities: ObjectPool<T>,
    grid: SpatialGrid,
    particles: ParticleSystem,
    camera: Camera,
    rng: Pcg32,
    seed: u64,
}

impl<T> Session<T> {
    /// Build a session from a validated config.
    pub fn new(config: SessionConfig) -> Result<Self, EngineError> {
        let entities = ObjectPool::with_capacity(config.entity_capacity, config.entity_growth)?;
        let grid = SpatialGrid::new(config.cell_size)?;
        let particles = ParticleSystem::new(config.particle_capacity)?;
        let camera = Camera::new(config.camera)?;
        log::info!("engine session created (seed {})", config.seed);
        Ok(Self {
            entities,
            grid,
            particles,
            camera,
            rng: Pcg32::seed_from_u64(config.seed),
            seed: config.seed,
        })
    }

    /// Seed this session was created with.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    // --- entities -----------------------------------------------------

    /// Spawn an entity: pool slot plus grid registration under `aabb`.
    pub fn spawn(&mut self, payload: T, aabb: Aabb) -> Result<Handle, EngineError> {
        let handle = self.entities.acquire(payload)?;
        self.grid.insert(handle, aabb);
        Ok(handle)
    }

    /// Despawn an entity, returning its payload.
    ///
    /// Idempotent like [`ObjectPool::release`]; a matching camera follow is
    /// cleared so the weak key cannot dangle.
    pub fn despawn(&mut self, handle: Handle) -> Option<T> {
        self.grid.remove(handle);
        if self.camera.follow_target() == Some(handle) {
            self.camera.clear_follow();
        }
        self.entities.release(handle)
    }

    /// Borrow an entity payload.
    pub fn entity(&self, handle: Handle) -> Result<&T, EngineError> {
        self.entities.get(handle)
    }

    /// Mutably borrow an entity payload.
    pub fn entity_mut(&mut self, handle: Handle) -> Result<&mut T, EngineError> {
        self.entities.get_mut(handle)
    }

    /// Re-register an entity under a new bounding box.
    pub fn move_entity(&mut self, handle: Handle, aabb: Aabb) -> Result<(), EngineError> {
        if !self.entities.contains(handle) {
            return Err(EngineError::InvalidHandle(handle));
        }
        self.grid.update(handle, aabb);
        Ok(())
    }

    /// The bounding box an entity is registered under.
    pub fn aabb_of(&self, handle: Handle) -> Option<Aabb> {
        self.grid.aabb_of(handle)
    }

    /// Live entities in ascending slot order.
    pub fn iter_entities(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.entities.iter_active()
    }

    /// Number of live entities.
    #[inline]
    pub fn active_entities(&self) -> usize {
        self.entities.active_count()
    }

    // --- collision ----------------------------------------------------

    /// Broad-phase candidates overlapping a region.
    pub fn query_region(&self, aabb: &Aabb) -> Vec<Handle> {
        self.grid.query(aabb)
    }

    /// Broad-phase candidates for an entity, excluding the entity itself.
    ///
    /// Callers confirm candidates with the narrow-phase test matching each
    /// entity's shape (see [`crate::collision::narrow`]).
    pub fn query_collisions(&self, handle: Handle) -> Result<Vec<Handle>, EngineError> {
        let aabb = self
            .grid
            .aabb_of(handle)
            .ok_or(EngineError::InvalidHandle(handle))?;
        let mut candidates = self.grid.query(&aabb);
        candidates.retain(|&other| other != handle);
        Ok(candidates)
    }

    // --- particles ----------------------------------------------------

    /// Emit up to `count` particles at `origin`, returning the number
    /// actually emitted (a full pool degrades the burst, never errors).
    pub fn emit_particles(&mut self, origin: Vec2, count: usize, config: &EmitterConfig) -> usize {
        self.particles.emit(origin, count, config, &mut self.rng)
    }

    /// Advance particles; expired ones are released within this call.
    pub fn update_particles(&mut self, dt: f32) {
        self.particles.update(dt);
    }

    /// Live particles for rendering.
    pub fn iter_particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    /// Number of live particles.
    #[inline]
    pub fn live_particles(&self) -> usize {
        self.particles.live_count()
    }

    // --- camera -------------------------------------------------------

    /// Advance the camera: resolve the follow target through the grid, step
    /// the follow smoothing, then decay shake and clamp to bounds.
    ///
    /// A follow handle that no longer resolves (despawned or stale) is
    /// silently cleared; the camera simply stays where it is.
    pub fn update_camera(&mut self, dt: f32) {
        if let Some(target) = self.camera.follow_target() {
            match self.grid.aabb_of(target) {
                Some(aabb) => {
                    let smoothing = self.camera.follow_smoothing();
                    self.camera.follow(aabb.center(), smoothing, dt);
                }
                None => {
                    log::debug!("camera follow target is stale, clearing");
                    self.camera.clear_follow();
                }
            }
        }
        self.camera.update(dt, &mut self.rng);
    }

    /// Follow a live entity with the given smoothing.
    pub fn follow_entity(&mut self, handle: Handle, smoothing: f32) -> Result<(), EngineError> {
        if !self.entities.contains(handle) {
            return Err(EngineError::InvalidHandle(handle));
        }
        self.camera.set_follow(handle, smoothing);
        Ok(())
    }

    pub fn clear_follow(&mut self) {
        self.camera.clear_follow();
    }

    /// Transform snapshot for the renderer.
    pub fn camera_transform(&self) -> CameraTransform {
        self.camera.transform()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Direct camera access for shake/zoom/center calls.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_at(x: f32, y: f32, w: f32, h: f32) -> Aabb {
        Aabb::from_pos_size(Vec2::new(x, y), Vec2::new(w, h))
    }

    fn session() -> Session<&'static str> {
        Session::new(SessionConfig {
            seed: 42,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let bad_cell = SessionConfig {
            cell_size: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            Session::<()>::new(bad_cell),
            Err(EngineError::OutOfRangeConfig(_))
        ));

        let bad_pool = SessionConfig {
            entity_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            Session::<()>::new(bad_pool),
            Err(EngineError::OutOfRangeConfig(_))
        ));
    }

    #[test]
    fn test_spawn_query_despawn_flow() {
        let mut s = session();
        let player = s.spawn("player", box_at(0.0, 0.0, 16.0, 16.0)).unwrap();
        let enemy = s.spawn("enemy", box_at(8.0, 8.0, 16.0, 16.0)).unwrap();
        let far = s.spawn("far", box_at(500.0, 500.0, 16.0, 16.0)).unwrap();

        let mut hits = s.query_collisions(player).unwrap();
        hits.sort();
        assert_eq!(hits, vec![enemy]);

        assert_eq!(s.despawn(enemy), Some("enemy"));
        assert!(s.query_collisions(player).unwrap().is_empty());
        assert_eq!(s.entity(far), Ok(&"far"));

        // Stale handle everywhere after despawn
        assert_eq!(s.entity(enemy), Err(EngineError::InvalidHandle(enemy)));
        assert_eq!(
            s.query_collisions(enemy),
            Err(EngineError::InvalidHandle(enemy))
        );
        assert_eq!(s.despawn(enemy), None);
    }

    #[test]
    fn test_move_entity_updates_queries() {
        let mut s = session();
        let h = s.spawn("mover", box_at(0.0, 0.0, 16.0, 16.0)).unwrap();
        let region = box_at(300.0, 300.0, 32.0, 32.0);
        assert!(s.query_region(&region).is_empty());

        s.move_entity(h, box_at(310.0, 310.0, 16.0, 16.0)).unwrap();
        assert_eq!(s.query_region(&region), vec![h]);

        s.despawn(h);
        assert_eq!(
            s.move_entity(h, box_at(0.0, 0.0, 16.0, 16.0)),
            Err(EngineError::InvalidHandle(h))
        );
    }

    #[test]
    fn test_emit_expire_returns_pool_to_pre_emit_count() {
        let mut s = session();
        let before = s.live_particles();

        let config = EmitterConfig {
            lifetime: (1.0, 1.0),
            ..Default::default()
        };
        let emitted = s.emit_particles(Vec2::ZERO, 10, &config);
        assert_eq!(emitted, 10);
        assert_eq!(s.live_particles(), before + 10);

        for _ in 0..4 {
            s.update_particles(0.25);
        }
        assert_eq!(s.live_particles(), before);
    }

    #[test]
    fn test_emit_degrades_when_pool_small() {
        let mut s = Session::<()>::new(SessionConfig {
            particle_capacity: 3,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(s.emit_particles(Vec2::ZERO, 10, &EmitterConfig::default()), 3);
    }

    #[test]
    fn test_camera_follows_entity_until_stale() {
        let mut s = session();
        let h = s.spawn("target", box_at(92.0, 92.0, 16.0, 16.0)).unwrap();
        s.follow_entity(h, 1.0).unwrap();

        // Center of the box is (100, 100); one full-smoothing second lands
        // on it
        s.update_camera(1.0);
        let t = s.camera_transform();
        assert!((t.position - Vec2::new(100.0, 100.0)).length() < 1e-3);

        s.despawn(h);
        assert_eq!(s.camera().follow_target(), None);

        // A stale follow set behind the session's back is cleared quietly
        let h2 = s.spawn("other", box_at(0.0, 0.0, 8.0, 8.0)).unwrap();
        s.despawn(h2);
        s.camera_mut().set_follow(h2, 1.0);
        s.update_camera(0.1);
        assert_eq!(s.camera().follow_target(), None);
        let after = s.camera_transform();
        assert_eq!(after.position, t.position);
    }

    #[test]
    fn test_follow_rejects_stale_handle() {
        let mut s = session();
        let h = s.spawn("x", box_at(0.0, 0.0, 8.0, 8.0)).unwrap();
        s.despawn(h);
        assert_eq!(s.follow_entity(h, 0.5), Err(EngineError::InvalidHandle(h)));
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = |seed: u64| {
            let mut s = Session::<u32>::new(SessionConfig {
                seed,
                ..Default::default()
            })
            .unwrap();
            s.emit_particles(Vec2::new(50.0, 50.0), 20, &EmitterConfig::sparks(Some(0.0)));
            s.camera_mut().shake(8.0, 0.5);
            for _ in 0..6 {
                s.update_camera(1.0 / 60.0);
                s.update_particles(1.0 / 60.0);
            }
            let particles: Vec<Vec2> = s.iter_particles().map(|p| p.pos).collect();
            (particles, s.camera_transform())
        };

        assert_eq!(run(7), run(7));
        assert_ne!(run(7).1.shake_offset, run(8).1.shake_offset);
    }

    #[test]
    fn test_entity_payload_roundtrip() {
        let mut s = Session::<Vec<u8>>::new(SessionConfig::default()).unwrap();
        let h = s.spawn(vec![1, 2, 3], box_at(0.0, 0.0, 4.0, 4.0)).unwrap();
        s.entity_mut(h).unwrap().push(4);
        assert_eq!(s.despawn(h), Some(vec![1, 2, 3, 4]));
    }
}
