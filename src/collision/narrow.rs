//! Exact narrow-phase overlap tests
//!
//! Applied by game code to the candidate pairs the broad phase hands back,
//! using whichever test matches the entity shapes involved. All overlap tests
//! are strict, matching [`Aabb::intersects`]: tangent shapes do not collide.

use glam::Vec2;

use super::aabb::Aabb;

/// Circle vs circle.
#[inline]
pub fn circle_circle(c1: Vec2, r1: f32, c2: Vec2, r2: f32) -> bool {
    let reach = r1 + r2;
    c1.distance_squared(c2) < reach * reach
}

/// Axis-aligned box vs axis-aligned box.
#[inline]
pub fn aabb_aabb(a: &Aabb, b: &Aabb) -> bool {
    a.intersects(b)
}

/// Circle vs axis-aligned box, via the closest point on the box to the
/// circle center.
#[inline]
pub fn circle_aabb(center: Vec2, radius: f32, aabb: &Aabb) -> bool {
    let closest = center.clamp(aabb.min, aabb.max);
    center.distance_squared(closest) < radius * radius
}

/// Point vs circle.
#[inline]
pub fn point_in_circle(point: Vec2, center: Vec2, radius: f32) -> bool {
    point.distance_squared(center) < radius * radius
}

/// Point vs axis-aligned box (inclusive edges).
#[inline]
pub fn point_in_aabb(point: Vec2, aabb: &Aabb) -> bool {
    aabb.contains_point(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_circle() {
        assert!(circle_circle(Vec2::ZERO, 5.0, Vec2::new(8.0, 0.0), 5.0));
        // Tangent circles do not collide
        assert!(!circle_circle(Vec2::ZERO, 5.0, Vec2::new(10.0, 0.0), 5.0));
        assert!(!circle_circle(Vec2::ZERO, 5.0, Vec2::new(11.0, 0.0), 5.0));
    }

    #[test]
    fn test_circle_aabb() {
        let box_ = Aabb::from_pos_size(Vec2::new(10.0, 10.0), Vec2::splat(20.0));

        // Circle center inside the box
        assert!(circle_aabb(Vec2::new(15.0, 15.0), 1.0, &box_));
        // Circle overlapping an edge from outside
        assert!(circle_aabb(Vec2::new(5.0, 20.0), 6.0, &box_));
        // Near a corner: closest point is the corner itself
        assert!(!circle_aabb(Vec2::new(5.0, 5.0), 7.0, &box_));
        assert!(circle_aabb(Vec2::new(5.0, 5.0), 7.1, &box_));
    }

    #[test]
    fn test_point_tests() {
        assert!(point_in_circle(Vec2::new(1.0, 1.0), Vec2::ZERO, 2.0));
        assert!(!point_in_circle(Vec2::new(2.0, 0.0), Vec2::ZERO, 2.0));

        let box_ = Aabb::from_pos_size(Vec2::ZERO, Vec2::splat(4.0));
        assert!(point_in_aabb(Vec2::new(4.0, 4.0), &box_));
        assert!(!point_in_aabb(Vec2::new(4.5, 2.0), &box_));
    }
}
