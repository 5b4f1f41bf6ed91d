//! Player Entity
//!
//! Position, life state and target-seeking movement for one avatar, plus
//! the four ability states and the daggers it has in flight.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::timer::Millis;
use crate::core::vec2::Vec2;
use crate::game::ability::{AbilityKind, AbilitySet, AbilityState, TargetInfo};
use crate::game::collision::circle_hits_any_wall;
use crate::game::config::{CombatConfig, ARRIVE_EPSILON};
use crate::game::map::Wall;
use crate::game::projectile::{Dagger, TargetSighting};

// =============================================================================
// PLAYER ID
// =============================================================================

/// Connection identifier assigned by the relay.
///
/// Implements Ord for stable BTreeMap ordering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub uuid::Uuid);

impl PlayerId {
    /// Fresh random id.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse from a UUID string.
    pub fn parse(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(Self)
    }

    /// First eight hex digits, for logs.
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }
}

impl fmt::Debug for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerId({})", self.short())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// PLAYER ENTITY
// =============================================================================

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Relay says dead; the kill path ran.
    Killed,
    /// Relay says alive; the respawn path ran.
    Respawned,
}

/// One avatar, local or remote.
#[derive(Clone, Debug)]
pub struct PlayerEntity {
    /// Connection id.
    pub id: PlayerId,
    /// Nickname.
    pub name: String,
    /// Display color (`#rrggbb`).
    pub color: String,
    /// Center position.
    pub position: Vec2,
    /// Movement speed (px/s).
    pub speed: f32,
    /// Hit radius.
    pub radius: f32,
    /// Daggers this player has in flight.
    pub daggers: Vec<Dagger>,
    target: Option<Vec2>,
    alive: bool,
    alive_remote: Option<bool>,
    respawn_at: Option<Millis>,
    abilities: AbilitySet,
}

impl PlayerEntity {
    fn new(id: PlayerId, name: &str, color: &str, position: Vec2, config: &CombatConfig) -> Self {
        Self {
            id,
            name: name.to_string(),
            color: color.to_string(),
            position,
            speed: config.player_speed,
            radius: config.player_radius,
            daggers: Vec::new(),
            target: None,
            alive: true,
            alive_remote: None,
            respawn_at: None,
            abilities: AbilitySet::new(),
        }
    }

    /// The player this client controls, placed at the spawn point.
    ///
    /// Its life state is authoritative locally; it never reconciles.
    pub fn local(id: PlayerId, name: &str, color: &str, config: &CombatConfig) -> Self {
        Self::new(id, name, color, config.spawn_point, config)
    }

    /// A player first seen in a relay snapshot.
    pub fn remote(
        id: PlayerId,
        name: &str,
        color: &str,
        position: Vec2,
        alive: bool,
        config: &CombatConfig,
    ) -> Self {
        let mut player = Self::new(id, name, color, position, config);
        player.alive = alive;
        player.alive_remote = Some(alive);
        player
    }

    // -------------------------------------------------------------------------
    // Read-only state
    // -------------------------------------------------------------------------

    /// Whether the player is alive locally.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Whether this entity mirrors a remote player.
    #[inline]
    pub fn is_remote(&self) -> bool {
        self.alive_remote.is_some()
    }

    /// Last relay-reported life state (remote players only).
    pub fn alive_remote(&self) -> Option<bool> {
        self.alive_remote
    }

    /// Deflect is in effect.
    #[inline]
    pub fn is_invulnerable(&self, now: Millis) -> bool {
        self.abilities.get(AbilityKind::Deflect).is_active(now)
    }

    /// Current movement target.
    pub fn target(&self) -> Option<Vec2> {
        self.target
    }

    /// Has a movement target.
    pub fn is_moving(&self) -> bool {
        self.target.is_some()
    }

    /// Pending automatic respawn time.
    pub fn respawn_at(&self) -> Option<Millis> {
        self.respawn_at
    }

    /// All ability states.
    pub fn abilities(&self) -> &AbilitySet {
        &self.abilities
    }

    pub(crate) fn abilities_mut(&mut self) -> &mut AbilitySet {
        &mut self.abilities
    }

    /// One ability's state.
    pub fn ability(&self, kind: AbilityKind) -> &AbilityState {
        self.abilities.get(kind)
    }

    /// Snapshot for aiming a dagger at this player.
    pub fn as_target(&self) -> TargetInfo {
        TargetInfo {
            id: self.id,
            position: self.position,
            alive: self.alive,
        }
    }

    /// Snapshot for steering a dagger in flight.
    pub fn sighting(&self) -> TargetSighting {
        TargetSighting {
            position: self.position,
            radius: self.radius,
            alive: self.alive,
        }
    }

    // -------------------------------------------------------------------------
    // Movement
    // -------------------------------------------------------------------------

    /// Walk toward `point`. Ignored while dead.
    pub fn move_to(&mut self, point: Vec2) {
        if !self.alive {
            return;
        }
        self.target = Some(point);
    }

    /// Drop the movement target.
    pub fn stop(&mut self) {
        self.target = None;
    }

    /// Instant position assignment; cancels any walk.
    pub fn teleport(&mut self, point: Vec2) {
        self.position = point;
        self.target = None;
    }

    /// Advance toward the target by `speed * dt`, sliding along walls.
    ///
    /// Candidates, first clear one wins: full step, x only, y only, half
    /// step. All blocked stops the walk, as does arriving at a target the
    /// body cannot fit on.
    pub fn update_movement(&mut self, dt_ms: Millis, walls: &[Wall]) {
        if !self.alive {
            return;
        }
        let target = match self.target {
            Some(t) => t,
            None => return,
        };

        let to_target = target.sub(self.position);
        let remaining = to_target.length();
        if remaining < ARRIVE_EPSILON {
            if !circle_hits_any_wall(target, self.radius, walls) {
                self.position = target;
            }
            self.target = None;
            return;
        }

        let step_len = (self.speed * dt_ms as f32 / 1000.0).min(remaining);
        let step = to_target.scale(step_len / remaining);

        let candidates = [
            self.position.add(step),
            Vec2::new(self.position.x + step.x, self.position.y),
            Vec2::new(self.position.x, self.position.y + step.y),
            self.position.add(step.scale(0.5)),
        ];

        // A zero-length axis step is no progress, not a clear path
        match candidates
            .into_iter()
            .filter(|candidate| *candidate != self.position)
            .find(|candidate| !circle_hits_any_wall(*candidate, self.radius, walls))
        {
            Some(next) => self.position = next,
            None => self.target = None,
        }
    }

    // -------------------------------------------------------------------------
    // Life cycle
    // -------------------------------------------------------------------------

    /// Kill this player.
    ///
    /// No-op (returns `false`) if already dead or deflecting. Locally
    /// authoritative players schedule their own respawn; remote mirrors
    /// wait for the relay to report them alive again.
    pub fn die(&mut self, now: Millis, respawn_delay_ms: Millis) -> bool {
        if !self.alive || self.is_invulnerable(now) {
            return false;
        }
        self.alive = false;
        self.target = None;
        match self.alive_remote.as_mut() {
            Some(remote) => *remote = false,
            None => self.respawn_at = Some(now + respawn_delay_ms),
        }
        true
    }

    /// Back to the spawn point, alive, standing still.
    pub fn respawn(&mut self, spawn: Vec2) {
        self.alive = true;
        self.position = spawn;
        self.target = None;
        self.respawn_at = None;
        if let Some(remote) = self.alive_remote.as_mut() {
            *remote = true;
        }
    }

    /// The scheduled respawn is due.
    pub fn respawn_due(&self, now: Millis) -> bool {
        !self.alive && self.respawn_at.map_or(false, |at| now >= at)
    }

    /// Record the relay's view of this player's life state.
    pub fn set_alive_remote(&mut self, alive: bool) {
        self.alive_remote = Some(alive);
    }

    /// Converge local life state onto the relay-reported one.
    ///
    /// A revived remote stays where the relay last placed it.
    pub fn reconcile(&mut self, now: Millis, respawn_delay_ms: Millis) -> Option<Reconciled> {
        match self.alive_remote {
            Some(false) if self.alive => {
                self.die(now, respawn_delay_ms).then_some(Reconciled::Killed)
            }
            Some(true) if !self.alive => {
                self.respawn(self.position);
                Some(Reconciled::Respawned)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ability::activate_deflect;
    use crate::game::collision::circle_intersects_rect;
    use crate::game::map::ArenaMap;
    use proptest::prelude::*;
    use rand::{Rng, SeedableRng};

    fn config() -> CombatConfig {
        CombatConfig::default()
    }

    fn local_at(x: f32, y: f32) -> PlayerEntity {
        let mut player = PlayerEntity::local(PlayerId::new(), "ninja", "#ff0000", &config());
        player.teleport(Vec2::new(x, y));
        player
    }

    #[test]
    fn test_player_id_serde_as_string() {
        let id = PlayerId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: PlayerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert_eq!(PlayerId::parse(&id.to_string()), Some(id));
    }

    #[test]
    fn test_move_in_open_space() {
        let mut player = local_at(100.0, 100.0);
        player.move_to(Vec2::new(400.0, 100.0));
        player.update_movement(1_000, &[]);
        // 180 px/s
        assert!((player.position.x - 280.0).abs() < 1e-3);
        assert!(player.is_moving());
    }

    #[test]
    fn test_snaps_onto_target() {
        let mut player = local_at(100.0, 100.0);
        player.move_to(Vec2::new(101.0, 100.5));
        player.update_movement(16, &[]);
        assert_eq!(player.position, Vec2::new(101.0, 100.5));
        assert!(!player.is_moving());
    }

    #[test]
    fn test_does_not_overshoot() {
        let mut player = local_at(100.0, 100.0);
        player.move_to(Vec2::new(110.0, 100.0));
        player.update_movement(1_000, &[]);
        assert_eq!(player.position, Vec2::new(110.0, 100.0));
    }

    #[test]
    fn test_slides_along_wall() {
        // Wall directly to the right: x 140..200, y 0..300
        let walls = [Wall::new(Vec2::new(170.0, 150.0), 60.0, 300.0)];
        let mut player = local_at(120.0, 100.0);
        player.move_to(Vec2::new(300.0, 200.0));

        player.update_movement(100, &walls);
        // Diagonal and x-only blocked, y-only slide taken
        assert_eq!(player.position.x, 120.0);
        assert!(player.position.y > 100.0);
        assert!(player.is_moving());
    }

    #[test]
    fn test_fully_blocked_stops() {
        // Player wedged in a notch: walls right and below
        let walls = [
            Wall::new(Vec2::new(150.0, 100.0), 30.0, 200.0),
            Wall::new(Vec2::new(100.0, 150.0), 200.0, 30.0),
        ];
        let mut player = local_at(117.0, 117.0);
        assert!(!circle_hits_any_wall(player.position, player.radius, &walls));

        player.move_to(Vec2::new(300.0, 300.0));
        player.update_movement(100, &walls);
        assert_eq!(player.position, Vec2::new(117.0, 117.0));
        assert!(!player.is_moving());
    }

    #[test]
    fn test_target_inside_wall_margin_is_never_reached() {
        // Wall spans x -100..0; a body at x = 15 would overlap it
        let walls = [Wall::new(Vec2::new(-50.0, 0.0), 100.0, 200.0)];
        let mut player = local_at(16.9, 1.5);
        assert!(!circle_hits_any_wall(player.position, player.radius, &walls));

        player.move_to(Vec2::new(15.0, 0.0));
        for _ in 0..3 {
            player.update_movement(16, &walls);
            assert!(
                !circle_hits_any_wall(player.position, player.radius, &walls),
                "player overlaps wall at {:?}",
                player.position
            );
        }
        assert!(!player.is_moving());
    }

    #[test]
    fn test_straight_walk_into_wall_margin_stops() {
        let walls = [Wall::new(Vec2::new(-50.0, 0.0), 100.0, 200.0)];
        let mut player = local_at(60.0, 0.0);

        player.move_to(Vec2::new(5.0, 0.0));
        for _ in 0..1000 {
            player.update_movement(16, &walls);
        }
        assert!(!player.is_moving());
        assert!(!circle_hits_any_wall(player.position, player.radius, &walls));
        assert!(player.position.x > 0.0 && player.position.x < 60.0);
    }

    #[test]
    fn test_dead_player_cannot_move() {
        let mut player = local_at(100.0, 100.0);
        player.die(0, 1_500);
        player.move_to(Vec2::new(200.0, 200.0));
        assert!(!player.is_moving());
    }

    #[test]
    fn test_die_and_respawn() {
        let config = config();
        let mut player = local_at(300.0, 300.0);
        player.move_to(Vec2::new(500.0, 500.0));

        assert!(player.die(1_000, config.respawn_delay_ms));
        assert!(!player.is_alive());
        assert!(!player.is_moving());
        assert_eq!(player.respawn_at(), Some(2_500));
        assert!(!player.die(1_100, config.respawn_delay_ms));

        assert!(!player.respawn_due(2_499));
        assert!(player.respawn_due(2_500));
        player.respawn(config.spawn_point);
        assert!(player.is_alive());
        assert_eq!(player.position, config.spawn_point);
        assert_eq!(player.respawn_at(), None);
    }

    #[test]
    fn test_deflect_blocks_death_for_window_only() {
        let config = config();
        let mut player = local_at(300.0, 300.0);
        activate_deflect(&mut player, 0, &config).unwrap();

        for now in [0, 100, 350, 699] {
            assert!(!player.die(now, config.respawn_delay_ms));
            assert!(player.is_alive());
        }
        assert!(player.die(700, config.respawn_delay_ms));
    }

    #[test]
    fn test_remote_reconciliation() {
        let config = config();
        let mut remote = PlayerEntity::remote(
            PlayerId::new(), "other", "#0000ff", Vec2::new(300.0, 300.0), true, &config,
        );
        assert_eq!(remote.reconcile(0, config.respawn_delay_ms), None);

        remote.set_alive_remote(false);
        assert_eq!(
            remote.reconcile(10, config.respawn_delay_ms),
            Some(Reconciled::Killed)
        );
        assert!(!remote.is_alive());
        // Remote mirrors never schedule their own respawn
        assert_eq!(remote.respawn_at(), None);

        remote.set_alive_remote(true);
        assert_eq!(
            remote.reconcile(20, config.respawn_delay_ms),
            Some(Reconciled::Respawned)
        );
        assert!(remote.is_alive());
        assert_eq!(remote.position, Vec2::new(300.0, 300.0));
    }

    #[test]
    fn test_reconciled_respawn_keeps_relay_position() {
        let config = config();
        let mut remote = PlayerEntity::remote(
            PlayerId::new(), "other", "#0000ff", Vec2::new(300.0, 300.0), false, &config,
        );
        assert!(!remote.is_alive());

        // Snapshot reports it alive somewhere else
        remote.position = Vec2::new(500.0, 250.0);
        remote.set_alive_remote(true);
        assert_eq!(remote.reconcile(40, config.respawn_delay_ms), Some(Reconciled::Respawned));
        assert_eq!(remote.position, Vec2::new(500.0, 250.0));
    }

    #[test]
    fn test_local_player_never_reconciles() {
        let config = config();
        let mut player = local_at(300.0, 300.0);
        player.die(0, config.respawn_delay_ms);
        assert_eq!(player.reconcile(10, config.respawn_delay_ms), None);
        assert!(!player.is_alive());
    }

    #[test]
    fn test_random_walks_never_enter_walls() {
        let map = ArenaMap::standard();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut player = local_at(100.0, 100.0);

        for _ in 0..200 {
            let target = Vec2::new(rng.gen_range(0.0..800.0), rng.gen_range(0.0..600.0));
            player.move_to(target);
            for _ in 0..30 {
                player.update_movement(16, map.walls());
                for wall in map.walls() {
                    assert!(!circle_intersects_rect(player.position, player.radius, wall));
                }
            }
        }
    }

    proptest! {
        #[test]
        fn prop_movement_never_overlaps_walls(
            tx in 0.0f32..800.0,
            ty in 0.0f32..600.0,
            dt in 1u64..100,
        ) {
            let map = ArenaMap::standard();
            let mut player = local_at(100.0, 100.0);
            player.move_to(Vec2::new(tx, ty));
            for _ in 0..120 {
                player.update_movement(dt, map.walls());
                prop_assert!(!circle_hits_any_wall(player.position, player.radius, map.walls()));
            }
        }
    }
}
