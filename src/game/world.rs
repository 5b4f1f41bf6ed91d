//! Client World
//!
//! Everything one client knows: its own player, the remote players from
//! the last relay snapshot, the beams in flight, the map, and the
//! simulation clock. Input handling calls the trigger methods here; the
//! tick loop (`game::tick`) advances it.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::timer::Millis;
use crate::core::vec2::Vec2;
use crate::game::ability::{
    self, AbilityError, AbilityKind, AbilityRequest, AbilityUse,
};
use crate::game::collision::circles_overlap;
use crate::game::config::CombatConfig;
use crate::game::events::{GameEvent, GameEventData, KillCause};
use crate::game::map::ArenaMap;
use crate::game::player::{PlayerEntity, PlayerId};
use crate::game::projectile::Beam;

/// Fields the relay reports for a remote player.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSnapshot {
    /// Nickname.
    pub name: String,
    /// Display color.
    pub color: String,
    /// Last reported position.
    pub position: Vec2,
    /// Last reported life state.
    pub alive: bool,
}

/// Per-client simulation context.
#[derive(Debug)]
pub struct World {
    pub(crate) config: CombatConfig,
    pub(crate) map: ArenaMap,
    pub(crate) now_ms: Millis,
    pub(crate) local: PlayerEntity,
    pub(crate) remotes: BTreeMap<PlayerId, PlayerEntity>,
    pub(crate) beams: Vec<Beam>,
    pub(crate) pending_events: Vec<GameEvent>,
}

impl World {
    /// Create a world around the local player.
    pub fn new(local_id: PlayerId, name: &str, color: &str, config: CombatConfig, map: ArenaMap) -> Self {
        let local = PlayerEntity::local(local_id, name, color, &config);
        Self {
            config,
            map,
            now_ms: 0,
            local,
            remotes: BTreeMap::new(),
            beams: Vec::new(),
            pending_events: Vec::new(),
        }
    }

    // =========================================================================
    // READ-ONLY VIEWS
    // =========================================================================

    /// Simulation clock.
    pub fn now(&self) -> Millis {
        self.now_ms
    }

    /// Combat tuning in use.
    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Arena map.
    pub fn map(&self) -> &ArenaMap {
        &self.map
    }

    /// The local player's id.
    pub fn local_id(&self) -> PlayerId {
        self.local.id
    }

    /// The local player.
    pub fn local_player(&self) -> &PlayerEntity {
        &self.local
    }

    /// A remote player.
    pub fn remote(&self, id: &PlayerId) -> Option<&PlayerEntity> {
        self.remotes.get(id)
    }

    /// All remote players, by id.
    pub fn remotes(&self) -> impl Iterator<Item = &PlayerEntity> {
        self.remotes.values()
    }

    /// Every known player, local first.
    pub fn players(&self) -> impl Iterator<Item = &PlayerEntity> {
        std::iter::once(&self.local).chain(self.remotes.values())
    }

    /// Any known player.
    pub fn player(&self, id: PlayerId) -> Option<&PlayerEntity> {
        if id == self.local.id {
            Some(&self.local)
        } else {
            self.remotes.get(&id)
        }
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerEntity> {
        if id == self.local.id {
            Some(&mut self.local)
        } else {
            self.remotes.get_mut(&id)
        }
    }

    /// Ids of every known player, local first.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players().map(|p| p.id).collect()
    }

    /// Beams in flight.
    pub fn beams(&self) -> &[Beam] {
        &self.beams
    }

    /// Local player's ability state, for HUD cooldown bars.
    pub fn ability(&self, kind: AbilityKind) -> &ability::AbilityState {
        self.local.ability(kind)
    }

    /// Living remote player whose body contains `(x, y)`.
    pub fn pick_target(&self, x: f32, y: f32) -> Option<PlayerId> {
        let point = Vec2::new(x, y);
        self.remotes
            .values()
            .find(|p| p.is_alive() && circles_overlap(point, 0.0, p.position, p.radius))
            .map(|p| p.id)
    }

    // =========================================================================
    // LOCAL TRIGGERS
    // =========================================================================

    /// Walk the local player toward `(x, y)`, kept inside the arena.
    pub fn move_to(&mut self, x: f32, y: f32) {
        let point = self.map.clamp_inside(Vec2::new(x, y), self.local.radius);
        self.local.move_to(point);
    }

    /// Stop walking.
    pub fn stop(&mut self) {
        self.local.stop();
    }

    /// Deflect.
    pub fn activate_deflect(&mut self) -> Result<AbilityUse, AbilityError> {
        self.trigger(self.local.id, AbilityRequest::Deflect)
    }

    /// Blink toward `(x, y)` using the map walls and configured range.
    pub fn try_blink(&mut self, x: f32, y: f32) -> Result<AbilityUse, AbilityError> {
        let request = AbilityRequest::Blink { destination: Vec2::new(x, y) };
        self.trigger(self.local.id, request)
    }

    /// Shockwave toward `(x, y)`.
    pub fn launch_shockwave(&mut self, x: f32, y: f32) -> Result<AbilityUse, AbilityError> {
        let request = AbilityRequest::Shockwave { target: Vec2::new(x, y) };
        self.trigger(self.local.id, request)
    }

    /// Dagger at `target_id`.
    pub fn launch_dagger(&mut self, target_id: PlayerId) -> Result<AbilityUse, AbilityError> {
        let request = AbilityRequest::Dagger { target_id, origin: None };
        self.trigger(self.local.id, request)
    }

    /// Kill the local player with no attacker.
    pub fn suicide(&mut self) -> bool {
        let id = self.local.id;
        self.kill(id, None, KillCause::SelfInflicted)
    }

    // =========================================================================
    // SHARED TRIGGER PATH
    // =========================================================================

    /// Run a trigger for any known player (local input or relayed replay).
    ///
    /// Queues an `AbilityUsed` or `AbilityRejected` event either way,
    /// except for unknown casters which leave no trace.
    pub fn trigger(&mut self, player_id: PlayerId, request: AbilityRequest) -> Result<AbilityUse, AbilityError> {
        let now = self.now_ms;

        let target = match request {
            AbilityRequest::Dagger { target_id, .. } => self.player(target_id).map(|p| p.as_target()),
            _ => None,
        };

        let World { config, map, local, remotes, beams, .. } = &mut *self;
        let player = if player_id == local.id {
            local
        } else {
            match remotes.get_mut(&player_id) {
                Some(p) => p,
                None => return Err(AbilityError::UnknownPlayer),
            }
        };

        let result = match request {
            AbilityRequest::Deflect => ability::activate_deflect(player, now, config),
            AbilityRequest::Blink { destination } => {
                let landing = map.clamp_inside(
                    destination.clamp_distance_from(player.position, config.blink_range),
                    player.radius,
                );
                ability::try_blink(player, landing, map.walls(), config.blink_range, now, config)
            }
            AbilityRequest::Shockwave { target } => {
                ability::launch_shockwave(player, target, now, config).map(|(used, beam)| {
                    beams.push(beam);
                    used
                })
            }
            AbilityRequest::Dagger { origin, .. } => {
                ability::launch_dagger(player, target, origin, now, config)
            }
        };

        let data = match result {
            Ok(ability) => GameEventData::AbilityUsed { player_id, ability },
            Err(reason) => {
                debug!("Trigger {:?} for {:?} rejected: {}", request.kind(), player_id, reason);
                GameEventData::AbilityRejected {
                    player_id,
                    ability: request.kind(),
                    reason,
                }
            }
        };
        self.pending_events.push(GameEvent::new(now, data));
        result
    }

    // =========================================================================
    // RELAY SNAPSHOTS
    // =========================================================================

    /// Create or refresh a remote player from a relay snapshot.
    ///
    /// The local player's own record is ignored.
    pub fn upsert_remote(&mut self, id: PlayerId, snapshot: RemoteSnapshot) {
        if id == self.local.id {
            return;
        }
        match self.remotes.get_mut(&id) {
            Some(remote) => {
                remote.position = snapshot.position;
                remote.name = snapshot.name;
                remote.color = snapshot.color;
                remote.set_alive_remote(snapshot.alive);
            }
            None => {
                debug!("New remote player {:?}", id);
                let remote = PlayerEntity::remote(
                    id,
                    &snapshot.name,
                    &snapshot.color,
                    snapshot.position,
                    snapshot.alive,
                    &self.config,
                );
                self.remotes.insert(id, remote);
            }
        }
    }

    /// Drop remote players the relay no longer reports.
    pub fn retain_remotes<F>(&mut self, mut keep: F)
    where
        F: FnMut(&PlayerId) -> bool,
    {
        self.remotes.retain(|id, _| keep(id));
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Apply a kill. `false` if the victim is unknown, dead or deflecting.
    pub(crate) fn kill(&mut self, victim_id: PlayerId, killer_id: Option<PlayerId>, cause: KillCause) -> bool {
        let now = self.now_ms;
        let delay = self.config.respawn_delay_ms;
        let died = match self.player_mut(victim_id) {
            Some(victim) => victim.die(now, delay),
            None => false,
        };
        if died {
            self.pending_events.push(GameEvent::new(
                now,
                GameEventData::PlayerKilled { victim_id, killer_id, cause },
            ));
        }
        died
    }

    pub(crate) fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }
}
