//! Collision Detection
//!
//! Geometric tests shared by movement, blink validation and hit
//! resolution: circle vs. wall rectangle, beam segment vs. circle, and
//! pure-pursuit steering.

use crate::core::vec2::Vec2;
use crate::game::map::Wall;

/// Check if a circle overlaps a wall rectangle.
///
/// Clamps the center to the rectangle to find the closest point; the
/// circle hits iff that point is strictly closer than `radius`.
#[inline]
pub fn circle_intersects_rect(center: Vec2, radius: f32, wall: &Wall) -> bool {
    let closest = wall.closest_point(center);
    center.distance_squared(closest) < radius * radius
}

/// Check a circle against every wall.
pub fn circle_hits_any_wall(center: Vec2, radius: f32, walls: &[Wall]) -> bool {
    walls.iter().any(|wall| circle_intersects_rect(center, radius, wall))
}

/// Check if two circles overlap.
#[inline]
pub fn circles_overlap(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> bool {
    let combined = radius_a + radius_b;
    pos_a.distance_squared(pos_b) < combined * combined
}

/// Beam hit test.
///
/// The beam is the segment `origin .. origin + heading * length`
/// (`heading` must be unit length). `point` is hit when its projection
/// lies on the segment (`t` in `[0, 1]`) and its perpendicular distance
/// to the segment is below `radius`.
pub fn segment_circle_hit(origin: Vec2, heading: Vec2, length: f32, point: Vec2, radius: f32) -> bool {
    if length <= 0.0 {
        return false;
    }
    let along = point.sub(origin).dot(heading);
    let t = along / length;
    if !(0.0..=1.0).contains(&t) {
        return false;
    }
    let projected = origin.add(heading.scale(along));
    point.distance_squared(projected) < radius * radius
}

/// Pure pursuit: unit heading from `from` straight at `to`.
///
/// No lead prediction; a target moving sideways fast enough outruns it.
#[inline]
pub fn pursuit_heading(from: Vec2, to: Vec2) -> Vec2 {
    to.sub(from).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> Wall {
        // Spans x 80..120, y 90..110
        Wall::new(Vec2::new(100.0, 100.0), 40.0, 20.0)
    }

    #[test]
    fn test_circle_rect_overlap() {
        let wall = block();
        // Touching the right edge from outside with a larger radius
        assert!(circle_intersects_rect(Vec2::new(125.0, 100.0), 6.0, &wall));
        // Clear of the right edge
        assert!(!circle_intersects_rect(Vec2::new(130.0, 100.0), 6.0, &wall));
        // Exactly tangent is not a hit
        assert!(!circle_intersects_rect(Vec2::new(126.0, 100.0), 6.0, &wall));
        // Center inside the rectangle
        assert!(circle_intersects_rect(Vec2::new(100.0, 100.0), 1.0, &wall));
    }

    #[test]
    fn test_circle_rect_uses_height_for_y() {
        let wall = block();
        // 15px below the center is 5px past the bottom edge (height 20)
        assert!(circle_intersects_rect(Vec2::new(100.0, 115.0), 6.0, &wall));
        // 17px below: 7px past the edge, clear with radius 6
        assert!(!circle_intersects_rect(Vec2::new(100.0, 117.0), 6.0, &wall));
    }

    #[test]
    fn test_corner_distance() {
        let wall = block();
        // Diagonal from the (120, 110) corner by (3, 4) -> distance 5
        assert!(circle_intersects_rect(Vec2::new(123.0, 114.0), 5.5, &wall));
        assert!(!circle_intersects_rect(Vec2::new(123.0, 114.0), 4.5, &wall));
    }

    #[test]
    fn test_any_wall() {
        let walls = vec![block(), Wall::new(Vec2::new(300.0, 300.0), 10.0, 10.0)];
        assert!(circle_hits_any_wall(Vec2::new(300.0, 310.0), 6.0, &walls));
        assert!(!circle_hits_any_wall(Vec2::new(200.0, 200.0), 6.0, &walls));
        assert!(!circle_hits_any_wall(Vec2::ZERO, 6.0, &[]));
    }

    #[test]
    fn test_segment_hit_within_corridor() {
        let origin = Vec2::new(0.0, 0.0);
        let heading = Vec2::RIGHT;
        assert!(segment_circle_hit(origin, heading, 100.0, Vec2::new(50.0, 10.0), 12.0));
        assert!(!segment_circle_hit(origin, heading, 100.0, Vec2::new(50.0, 13.0), 12.0));
    }

    #[test]
    fn test_segment_hit_requires_projection_on_segment() {
        let origin = Vec2::new(0.0, 0.0);
        let heading = Vec2::RIGHT;
        // Behind the origin
        assert!(!segment_circle_hit(origin, heading, 100.0, Vec2::new(-5.0, 0.0), 12.0));
        // Past the tip
        assert!(!segment_circle_hit(origin, heading, 100.0, Vec2::new(105.0, 0.0), 12.0));
        // Exactly at the tip
        assert!(segment_circle_hit(origin, heading, 100.0, Vec2::new(100.0, 0.0), 12.0));
    }

    #[test]
    fn test_pursuit_heading() {
        let heading = pursuit_heading(Vec2::new(0.0, 0.0), Vec2::new(0.0, 10.0));
        assert_eq!(heading, Vec2::DOWN);
        assert_eq!(pursuit_heading(Vec2::new(5.0, 5.0), Vec2::new(5.0, 5.0)), Vec2::ZERO);
    }

    #[test]
    fn test_circles_overlap() {
        assert!(circles_overlap(Vec2::ZERO, 5.0, Vec2::new(9.0, 0.0), 5.0));
        assert!(!circles_overlap(Vec2::ZERO, 5.0, Vec2::new(11.0, 0.0), 5.0));
    }
}
