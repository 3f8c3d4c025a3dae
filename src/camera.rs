//! View transform: smooth follow, screen shake, zoom
//!
//! The camera owns no entities. Its follow target is a pooled [`Handle`]
//! resolved by the session through the spatial grid each frame, so a
//! despawned target silently stops the follow instead of dangling.
//!
//! Transform order is fixed: world points are translated by the camera
//! position, scaled by zoom, then offset by the shake in screen space. Shake
//! living in screen space keeps its amplitude independent of zoom.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::collision::Aabb;
use crate::consts;
use crate::error::EngineError;
use crate::polar_to_cartesian;
use crate::pool::Handle;

/// Camera construction parameters, validated by [`Camera::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Zoom clamp range; both bounds strictly positive.
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Viewport size in pixels, used for culling and bounds clamping.
    pub viewport: Vec2,
    /// Optional world-space bounds the view is kept inside.
    pub bounds: Option<Aabb>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_zoom: consts::DEFAULT_MIN_ZOOM,
            max_zoom: consts::DEFAULT_MAX_ZOOM,
            viewport: Vec2::new(
                consts::DEFAULT_VIEWPORT_WIDTH,
                consts::DEFAULT_VIEWPORT_HEIGHT,
            ),
            bounds: None,
        }
    }
}

impl CameraConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if !(self.min_zoom > 0.0 && self.min_zoom.is_finite()) {
            return Err(EngineError::OutOfRangeConfig("camera min zoom must be positive"));
        }
        if !(self.max_zoom >= self.min_zoom && self.max_zoom.is_finite()) {
            return Err(EngineError::OutOfRangeConfig("camera zoom range is inverted"));
        }
        if !(self.viewport.x > 0.0 && self.viewport.y > 0.0) {
            return Err(EngineError::OutOfRangeConfig("camera viewport must be positive"));
        }
        Ok(())
    }
}

/// Decaying random perturbation of the view.
#[derive(Debug, Clone, Copy, Default)]
struct Shake {
    magnitude: f32,
    duration: f32,
    elapsed: f32,
    offset: Vec2,
}

impl Shake {
    fn trigger(&mut self, magnitude: f32, duration: f32) {
        if magnitude <= 0.0 || duration <= 0.0 {
            return;
        }
        // Restart keeps the stronger of the two shakes
        self.magnitude = if self.is_active() { self.magnitude.max(magnitude) } else { magnitude };
        self.duration = duration;
        self.elapsed = 0.0;
    }

    #[inline]
    fn is_active(&self) -> bool {
        self.elapsed < self.duration
    }

    fn update<R: Rng + ?Sized>(&mut self, dt: f32, rng: &mut R) {
        if !self.is_active() {
            self.offset = Vec2::ZERO;
            return;
        }
        self.elapsed += dt;
        let falloff = 1.0 - self.elapsed / self.duration;
        if falloff <= 0.0 {
            // Exactly zero from elapsed >= duration on
            self.offset = Vec2::ZERO;
            return;
        }
        let theta = rng.random_range(0.0..std::f32::consts::TAU);
        self.offset = polar_to_cartesian(self.magnitude * falloff, theta);
    }
}

/// Snapshot of the camera transform handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraTransform {
    pub position: Vec2,
    pub zoom: f32,
    pub shake_offset: Vec2,
}

/// 2D view camera.
#[derive(Debug, Clone)]
pub struct Camera {
    config: CameraConfig,
    position: Vec2,
    zoom: f32,
    shake: Shake,
    follow: Option<Handle>,
    follow_smoothing: f32,
}

impl Camera {
    /// Create a camera at the origin with zoom 1 (clamped into the
    /// configured range). Misconfiguration is fatal.
    pub fn new(config: CameraConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let zoom = 1.0f32.clamp(config.min_zoom, config.max_zoom);
        Ok(Self {
            config,
            position: Vec2::ZERO,
            zoom,
            shake: Shake::default(),
            follow: None,
            follow_smoothing: 0.0,
        })
    }

    /// World point the camera is centered on.
    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Snap the camera to a world point.
    pub fn center_on(&mut self, point: Vec2) {
        self.position = point;
    }

    /// One step of exponential follow toward `target`:
    /// `position += (target - position) * clamp(smoothing, 0, 1) * dt`.
    ///
    /// A non-positive smoothing disables the follow for this step; it is not
    /// an error.
    pub fn follow(&mut self, target: Vec2, smoothing: f32, dt: f32) {
        if smoothing <= 0.0 {
            return;
        }
        self.position += (target - self.position) * smoothing.min(1.0) * dt;
    }

    /// Track `handle` with the given smoothing. The handle is a weak key:
    /// the session resolves it each frame and drops it once stale.
    pub fn set_follow(&mut self, handle: Handle, smoothing: f32) {
        self.follow = Some(handle);
        self.follow_smoothing = smoothing;
    }

    pub fn clear_follow(&mut self) {
        self.follow = None;
    }

    #[inline]
    pub fn follow_target(&self) -> Option<Handle> {
        self.follow
    }

    #[inline]
    pub fn follow_smoothing(&self) -> f32 {
        self.follow_smoothing
    }

    /// Current zoom factor; always within the configured clamp range.
    #[inline]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set zoom, clamping silently into `[min_zoom, max_zoom]`.
    pub fn set_zoom(&mut self, factor: f32) {
        self.zoom = factor.clamp(self.config.min_zoom, self.config.max_zoom);
    }

    /// One step of exponential zoom toward `target`, same form as
    /// [`Camera::follow`]. The target and result are clamped.
    pub fn zoom_toward(&mut self, target: f32, smoothing: f32, dt: f32) {
        if smoothing <= 0.0 {
            return;
        }
        let target = target.clamp(self.config.min_zoom, self.config.max_zoom);
        self.zoom += (target - self.zoom) * smoothing.min(1.0) * dt;
        self.zoom = self.zoom.clamp(self.config.min_zoom, self.config.max_zoom);
    }

    /// Start a shake, or restart the running one keeping the larger
    /// magnitude. Non-positive magnitude or duration is ignored.
    pub fn shake(&mut self, magnitude: f32, duration: f32) {
        self.shake.trigger(magnitude, duration);
    }

    #[inline]
    pub fn shake_offset(&self) -> Vec2 {
        self.shake.offset
    }

    #[inline]
    pub fn is_shaking(&self) -> bool {
        self.shake.is_active()
    }

    /// Advance shake decay and keep the view inside the configured bounds.
    ///
    /// The RNG drives the shake direction; feeding a seeded RNG makes the
    /// whole camera deterministic.
    pub fn update<R: Rng + ?Sized>(&mut self, dt: f32, rng: &mut R) {
        self.shake.update(dt, rng);
        self.clamp_to_bounds();
    }

    fn clamp_to_bounds(&mut self) {
        let Some(bounds) = self.config.bounds else {
            return;
        };
        let half_view = self.config.viewport / (2.0 * self.zoom);
        let size = bounds.size();

        // Per axis: pin to center when the bounds are narrower than the view
        self.position.x = if size.x <= half_view.x * 2.0 {
            bounds.center().x
        } else {
            self.position.x.clamp(bounds.min.x + half_view.x, bounds.max.x - half_view.x)
        };
        self.position.y = if size.y <= half_view.y * 2.0 {
            bounds.center().y
        } else {
            self.position.y.clamp(bounds.min.y + half_view.y, bounds.max.y - half_view.y)
        };
    }

    /// World to screen: translate by camera position, scale by zoom, then
    /// add the shake offset in screen space.
    #[inline]
    pub fn world_to_screen(&self, point: Vec2) -> Vec2 {
        (point - self.position) * self.zoom + self.shake.offset
    }

    /// Exact inverse of [`Camera::world_to_screen`].
    #[inline]
    pub fn screen_to_world(&self, point: Vec2) -> Vec2 {
        (point - self.shake.offset) / self.zoom + self.position
    }

    /// Whether a world-space box intersects the view, expanded by `margin`
    /// world units (culling helper for renderers).
    pub fn is_visible(&self, aabb: &Aabb, margin: f32) -> bool {
        let half_view = self.config.viewport / (2.0 * self.zoom);
        let view = Aabb::from_center_half_extents(self.position, half_view + Vec2::splat(margin));
        view.intersects(aabb)
    }

    /// Transform snapshot for the renderer.
    pub fn transform(&self) -> CameraTransform {
        CameraTransform {
            position: self.position,
            zoom: self.zoom,
            shake_offset: self.shake.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn camera() -> Camera {
        Camera::new(CameraConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        for config in [
            CameraConfig { min_zoom: 0.0, ..Default::default() },
            CameraConfig { min_zoom: -1.0, ..Default::default() },
            CameraConfig { min_zoom: 2.0, max_zoom: 1.0, ..Default::default() },
            CameraConfig { viewport: Vec2::ZERO, ..Default::default() },
        ] {
            assert!(matches!(
                Camera::new(config),
                Err(EngineError::OutOfRangeConfig(_))
            ));
        }
    }

    #[test]
    fn test_follow_exponential_step() {
        let mut cam = camera();
        cam.follow(Vec2::new(10.0, 0.0), 1.0, 0.5);
        assert!((cam.position().x - 5.0).abs() < 1e-5);
        cam.follow(Vec2::new(10.0, 0.0), 1.0, 0.5);
        assert!((cam.position().x - 7.5).abs() < 1e-5);
    }

    #[test]
    fn test_follow_disabled_by_nonpositive_smoothing() {
        let mut cam = camera();
        cam.follow(Vec2::new(10.0, 10.0), 0.0, 0.5);
        cam.follow(Vec2::new(10.0, 10.0), -3.0, 0.5);
        assert_eq!(cam.position(), Vec2::ZERO);
    }

    #[test]
    fn test_follow_smoothing_clamped_to_one() {
        let mut cam = camera();
        // smoothing 50 behaves as 1: a full dt=1 step lands on the target
        cam.follow(Vec2::new(4.0, 0.0), 50.0, 1.0);
        assert!((cam.position().x - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_zoom_clamps_silently() {
        let mut cam = camera();
        cam.set_zoom(100.0);
        assert_eq!(cam.zoom(), consts::DEFAULT_MAX_ZOOM);
        cam.set_zoom(0.0001);
        assert_eq!(cam.zoom(), consts::DEFAULT_MIN_ZOOM);
        assert!(cam.zoom() > 0.0);
    }

    #[test]
    fn test_shake_bounded_then_exactly_zero() {
        let mut cam = camera();
        let mut rng = Pcg32::seed_from_u64(5);
        cam.shake(10.0, 1.0);

        for _ in 0..3 {
            cam.update(0.25, &mut rng);
            assert!(cam.shake_offset().length() <= 10.0 + 1e-4);
            assert!(cam.shake_offset().length() > 0.0);
        }

        // elapsed reaches duration on the 4th step: offset is exactly zero
        cam.update(0.25, &mut rng);
        assert_eq!(cam.shake_offset(), Vec2::ZERO);
        assert!(!cam.is_shaking());

        cam.update(0.25, &mut rng);
        assert_eq!(cam.shake_offset(), Vec2::ZERO);
    }

    #[test]
    fn test_shake_restart_keeps_larger_magnitude() {
        let mut rng = Pcg32::seed_from_u64(5);

        let mut cam = camera();
        cam.shake(10.0, 1.0);
        cam.shake(3.0, 1.0);
        cam.update(0.1, &mut rng);
        // |offset| = magnitude * (1 - 0.1/1.0) with the larger magnitude kept
        assert!((cam.shake_offset().length() - 9.0).abs() < 1e-3);

        let mut cam = camera();
        cam.shake(3.0, 1.0);
        cam.shake(10.0, 1.0);
        cam.update(0.1, &mut rng);
        assert!((cam.shake_offset().length() - 9.0).abs() < 1e-3);
    }

    #[test]
    fn test_world_screen_roundtrip() {
        let mut cam = camera();
        let mut rng = Pcg32::seed_from_u64(11);
        cam.center_on(Vec2::new(100.0, 50.0));
        cam.set_zoom(2.0);
        cam.shake(6.0, 1.0);
        cam.update(0.1, &mut rng);

        let world = Vec2::new(130.0, 80.0);
        let screen = cam.world_to_screen(world);
        let expected = Vec2::new(30.0, 30.0) * 2.0 + cam.shake_offset();
        assert!((screen - expected).length() < 1e-4);

        let back = cam.screen_to_world(screen);
        assert!((back - world).length() < 1e-4);
    }

    #[test]
    fn test_bounds_clamp_view() {
        let config = CameraConfig {
            bounds: Some(Aabb::from_pos_size(Vec2::ZERO, Vec2::new(2000.0, 2000.0))),
            ..Default::default()
        };
        let mut cam = Camera::new(config).unwrap();
        let mut rng = Pcg32::seed_from_u64(1);
        cam.set_zoom(1.0);
        cam.center_on(Vec2::new(-500.0, 2500.0));
        cam.update(1.0 / 60.0, &mut rng);

        // Half view is (400, 300) at zoom 1 with the default viewport
        assert_eq!(cam.position(), Vec2::new(400.0, 1700.0));
    }

    #[test]
    fn test_zoom_toward_converges_within_range() {
        let mut cam = camera();
        cam.set_zoom(1.0);
        for _ in 0..2000 {
            cam.zoom_toward(3.0, 1.0, 0.1);
        }
        assert!((cam.zoom() - 3.0).abs() < 1e-3);
        cam.zoom_toward(100.0, 1.0, 1.0);
        assert!(cam.zoom() <= consts::DEFAULT_MAX_ZOOM);
    }

    #[test]
    fn test_is_visible_culling() {
        let mut cam = camera();
        cam.center_on(Vec2::ZERO);
        cam.set_zoom(1.0);

        let near = Aabb::from_center_half_extents(Vec2::new(100.0, 0.0), Vec2::splat(10.0));
        let far = Aabb::from_center_half_extents(Vec2::new(5000.0, 0.0), Vec2::splat(10.0));
        assert!(cam.is_visible(&near, 0.0));
        assert!(!cam.is_visible(&far, 0.0));
        // A margin pulls distant boxes into view
        assert!(cam.is_visible(&far, 5000.0));
    }
}
