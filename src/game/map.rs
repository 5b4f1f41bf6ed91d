//! Arena Map Geometry
//!
//! Static wall rectangles and arena bounds. Walls never change during a
//! session; the map is built once and shared read-only by movement,
//! blink validation and the combat resolver.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::config::{ARENA_HEIGHT, ARENA_WIDTH, WALL_UNIT};

/// Axis-aligned wall rectangle, stored by center and size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    /// Rectangle center.
    pub center: Vec2,
    /// Full width.
    pub width: f32,
    /// Full height.
    pub height: f32,
}

impl Wall {
    /// Create a wall from its center and full size.
    pub const fn new(center: Vec2, width: f32, height: f32) -> Self {
        Self { center, width, height }
    }

    /// Create a wall from a center and a size in [`WALL_UNIT`] tiles.
    pub fn from_tiles(cx: f32, cy: f32, tiles_w: f32, tiles_h: f32) -> Self {
        Self::new(Vec2::new(cx, cy), tiles_w * WALL_UNIT, tiles_h * WALL_UNIT)
    }

    /// Minimum corner.
    #[inline]
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.center.x - self.width / 2.0, self.center.y - self.height / 2.0)
    }

    /// Maximum corner.
    #[inline]
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.center.x + self.width / 2.0, self.center.y + self.height / 2.0)
    }

    /// Closest point on (or inside) the rectangle to `point`.
    #[inline]
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        let (min, max) = (self.min(), self.max());
        Vec2::new(point.x.clamp(min.x, max.x), point.y.clamp(min.y, max.y))
    }
}

/// The arena: bounds plus obstacles.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArenaMap {
    /// Arena width.
    pub width: f32,
    /// Arena height.
    pub height: f32,
    walls: Vec<Wall>,
}

impl ArenaMap {
    /// Create a map with custom walls.
    pub fn new(width: f32, height: f32, walls: Vec<Wall>) -> Self {
        Self { width, height, walls }
    }

    /// Open arena with no obstacles.
    pub fn empty() -> Self {
        Self::new(ARENA_WIDTH, ARENA_HEIGHT, Vec::new())
    }

    /// The standard five-block arena.
    pub fn standard() -> Self {
        let walls = vec![
            Wall::from_tiles(200.0, 200.0, 3.0, 2.0),
            Wall::from_tiles(600.0, 120.0, 4.0, 1.5),
            Wall::from_tiles(400.0, 300.0, 2.0, 4.0),
            Wall::from_tiles(200.0, 450.0, 3.0, 2.0),
            Wall::from_tiles(600.0, 450.0, 2.5, 2.0),
        ];
        Self::new(ARENA_WIDTH, ARENA_HEIGHT, walls)
    }

    /// All wall rectangles.
    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    /// Clamp a point so a circle of `radius` centred there stays in bounds.
    pub fn clamp_inside(&self, point: Vec2, radius: f32) -> Vec2 {
        Vec2::new(
            point.x.clamp(radius, (self.width - radius).max(radius)),
            point.y.clamp(radius, (self.height - radius).max(radius)),
        )
    }
}

impl Default for ArenaMap {
    fn default() -> Self {
        Self::standard()
    }
}
