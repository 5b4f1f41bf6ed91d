//! Combat Tuning
//!
//! Every gameplay constant in one place. Distances are pixels, speeds are
//! pixels per second, times are milliseconds.

use crate::core::timer::Millis;
use crate::core::vec2::Vec2;

// =============================================================================
// ARENA & PLAYER
// =============================================================================

/// Arena width.
pub const ARENA_WIDTH: f32 = 800.0;

/// Arena height.
pub const ARENA_HEIGHT: f32 = 600.0;

/// Tile size the wall layout is authored in.
pub const WALL_UNIT: f32 = 32.0;

/// Player movement speed.
pub const PLAYER_SPEED: f32 = 180.0;

/// Player hit radius (18px sprite scaled by 0.9).
pub const PLAYER_RADIUS: f32 = 16.2;

/// Distance under which a moving player snaps onto its target.
pub const ARRIVE_EPSILON: f32 = 2.0;

/// Delay between death and automatic respawn.
pub const RESPAWN_DELAY_MS: Millis = 1500;

/// Where every player (re)appears.
pub const SPAWN_POINT: Vec2 = Vec2::new(100.0, 100.0);

// =============================================================================
// ABILITIES
// =============================================================================

/// Deflect invulnerability window.
pub const DEFLECT_DURATION_MS: Millis = 700;

/// Deflect cooldown (runs concurrently with the duration).
pub const DEFLECT_COOLDOWN_MS: Millis = 2000;

/// Blink cooldown.
pub const BLINK_COOLDOWN_MS: Millis = 4000;

/// Maximum blink distance.
pub const BLINK_RANGE: f32 = 180.0;

/// Shockwave cooldown.
pub const SHOCKWAVE_COOLDOWN_MS: Millis = 2000;

/// Beam length.
pub const BEAM_LENGTH: f32 = 180.0;

/// Beam lifetime.
pub const BEAM_TTL_MS: Millis = 700;

/// Speed the beam origin travels along its heading.
pub const BEAM_SPEED: f32 = 400.0;

/// Extra corridor half-width added to the target radius for beam hits.
pub const BEAM_CORRIDOR_MARGIN: f32 = 8.0;

/// Dagger cooldown.
pub const DAGGER_COOLDOWN_MS: Millis = 5000;

/// Dagger flight speed.
pub const DAGGER_SPEED: f32 = 320.0;

/// Extra distance added to the target radius for dagger impact.
pub const DAGGER_IMPACT_MARGIN: f32 = 10.0;

/// Dagger lifetime failsafe.
pub const DAGGER_TTL_MS: Millis = 2000;

/// Tunable combat parameters for a [`World`](crate::game::world::World).
#[derive(Debug, Clone)]
pub struct CombatConfig {
    /// Player movement speed.
    pub player_speed: f32,
    /// Player hit radius.
    pub player_radius: f32,
    /// Respawn delay after death.
    pub respawn_delay_ms: Millis,
    /// Respawn location.
    pub spawn_point: Vec2,
    /// Deflect invulnerability window.
    pub deflect_duration_ms: Millis,
    /// Deflect cooldown.
    pub deflect_cooldown_ms: Millis,
    /// Blink cooldown.
    pub blink_cooldown_ms: Millis,
    /// Maximum blink distance.
    pub blink_range: f32,
    /// Shockwave cooldown.
    pub shockwave_cooldown_ms: Millis,
    /// Beam length.
    pub beam_length: f32,
    /// Beam lifetime.
    pub beam_ttl_ms: Millis,
    /// Beam travel speed.
    pub beam_speed: f32,
    /// Beam corridor margin.
    pub beam_margin: f32,
    /// Dagger cooldown.
    pub dagger_cooldown_ms: Millis,
    /// Dagger speed.
    pub dagger_speed: f32,
    /// Dagger impact margin.
    pub dagger_margin: f32,
    /// Dagger lifetime.
    pub dagger_ttl_ms: Millis,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            player_speed: PLAYER_SPEED,
            player_radius: PLAYER_RADIUS,
            respawn_delay_ms: RESPAWN_DELAY_MS,
            spawn_point: SPAWN_POINT,
            deflect_duration_ms: DEFLECT_DURATION_MS,
            deflect_cooldown_ms: DEFLECT_COOLDOWN_MS,
            blink_cooldown_ms: BLINK_COOLDOWN_MS,
            blink_range: BLINK_RANGE,
            shockwave_cooldown_ms: SHOCKWAVE_COOLDOWN_MS,
            beam_length: BEAM_LENGTH,
            beam_ttl_ms: BEAM_TTL_MS,
            beam_speed: BEAM_SPEED,
            beam_margin: BEAM_CORRIDOR_MARGIN,
            dagger_cooldown_ms: DAGGER_COOLDOWN_MS,
            dagger_speed: DAGGER_SPEED,
            dagger_margin: DAGGER_IMPACT_MARGIN,
            dagger_ttl_ms: DAGGER_TTL_MS,
        }
    }
}
