//! Daggers and Beams
//!
//! The two in-flight hit volumes. Both only *report* what they touched;
//! applying kills is the resolver's job (see `game::tick`).

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};

use crate::core::timer::Millis;
use crate::core::vec2::Vec2;
use crate::game::collision::{pursuit_heading, segment_circle_hit};
use crate::game::config::CombatConfig;
use crate::game::player::PlayerId;

#[inline]
fn seconds(dt_ms: Millis) -> f32 {
    dt_ms as f32 / 1000.0
}

// =============================================================================
// DAGGER
// =============================================================================

/// Where a dagger's target is this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSighting {
    /// Target center.
    pub position: Vec2,
    /// Target hit radius.
    pub radius: f32,
    /// Whether the target is alive.
    pub alive: bool,
}

/// Result of stepping a dagger once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaggerStep {
    /// Still flying.
    Flying,
    /// Lifetime ran out.
    Expired,
    /// Target vanished or died mid-flight.
    TargetLost,
    /// Reached the target; the dagger is spent.
    Impact,
}

/// Homing projectile. Holds its target by id only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dagger {
    /// Current position.
    pub position: Vec2,
    /// Unit heading.
    pub heading: Vec2,
    /// Flight speed (px/s).
    pub speed: f32,
    /// Pursued player.
    pub target_id: PlayerId,
    /// Launch time.
    pub spawned_at: Millis,
    /// Lifetime.
    pub ttl_ms: Millis,
    /// Impact margin added to the target radius.
    pub impact_margin: f32,
}

impl Dagger {
    /// Launch from `origin` toward where the target currently is.
    pub fn new(origin: Vec2, target_id: PlayerId, target_position: Vec2, now: Millis, config: &CombatConfig) -> Self {
        Self {
            position: origin,
            heading: pursuit_heading(origin, target_position),
            speed: config.dagger_speed,
            target_id,
            spawned_at: now,
            ttl_ms: config.dagger_ttl_ms,
            impact_margin: config.dagger_margin,
        }
    }

    /// Lifetime elapsed.
    #[inline]
    pub fn is_expired(&self, now: Millis) -> bool {
        now.saturating_sub(self.spawned_at) >= self.ttl_ms
    }

    /// Advance one tick.
    ///
    /// Order: lifetime, target validity, impact test, then pursuit.
    pub fn step(&mut self, now: Millis, dt_ms: Millis, target: Option<TargetSighting>) -> DaggerStep {
        if self.is_expired(now) {
            return DaggerStep::Expired;
        }
        let target = match target {
            Some(t) if t.alive => t,
            _ => return DaggerStep::TargetLost,
        };

        let reach = target.radius + self.impact_margin;
        if self.position.distance_squared(target.position) < reach * reach {
            return DaggerStep::Impact;
        }

        self.heading = pursuit_heading(self.position, target.position);
        self.position = self.position.add(self.heading.scale(self.speed * seconds(dt_ms)));
        DaggerStep::Flying
    }
}

// =============================================================================
// BEAM
// =============================================================================

/// Shockwave hit volume: a finite segment that travels along its heading.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Beam {
    /// Player who fired it; never hit by it.
    pub owner: PlayerId,
    /// Segment start.
    pub origin: Vec2,
    /// Unit heading.
    pub heading: Vec2,
    /// Segment length.
    pub length: f32,
    /// Travel speed (px/s).
    pub speed: f32,
    /// Corridor margin added to the target radius.
    pub margin: f32,
    /// Fire time.
    pub spawned_at: Millis,
    /// Lifetime.
    pub ttl_ms: Millis,
    hit: BTreeSet<PlayerId>,
}

impl Beam {
    /// Fire from `origin` toward `aim`.
    ///
    /// Aiming at the origin itself fires to the right.
    pub fn new(owner: PlayerId, origin: Vec2, aim: Vec2, now: Millis, config: &CombatConfig) -> Self {
        let heading = match pursuit_heading(origin, aim) {
            h if h == Vec2::ZERO => Vec2::RIGHT,
            h => h,
        };
        Self {
            owner,
            origin,
            heading,
            length: config.beam_length,
            speed: config.beam_speed,
            margin: config.beam_margin,
            spawned_at: now,
            ttl_ms: config.beam_ttl_ms,
            hit: BTreeSet::new(),
        }
    }

    /// Lifetime elapsed.
    #[inline]
    pub fn is_expired(&self, now: Millis) -> bool {
        now.saturating_sub(self.spawned_at) >= self.ttl_ms
    }

    /// Far end of the segment.
    pub fn tip(&self) -> Vec2 {
        self.origin.add(self.heading.scale(self.length))
    }

    /// Would this beam hit `id` at `position`?
    ///
    /// Excludes the owner and anyone already credited to this beam.
    pub fn touches(&self, id: PlayerId, position: Vec2, radius: f32) -> bool {
        if id == self.owner || self.hit.contains(&id) {
            return false;
        }
        segment_circle_hit(self.origin, self.heading, self.length, position, radius + self.margin)
    }

    /// Credit a kill so the same target is never killed twice by this beam.
    pub fn record_hit(&mut self, id: PlayerId) {
        self.hit.insert(id);
    }

    /// Players already killed by this beam.
    pub fn hits(&self) -> &BTreeSet<PlayerId> {
        &self.hit
    }

    /// Slide the segment forward.
    pub fn advance(&mut self, dt_ms: Millis) {
        self.origin = self.origin.add(self.heading.scale(self.speed * seconds(dt_ms)));
    }
}
