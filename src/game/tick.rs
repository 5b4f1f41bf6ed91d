//! Local Combat Resolver
//!
//! One cooperative frame of client simulation. Every client runs this
//! independently against its own view of the other players, so two
//! clients can disagree about a hit; the relay's snapshots settle it.
//!
//! Order per tick:
//!
//! 1. advance the clock
//! 2. per player: ability timers, reconciliation, scheduled respawn, movement
//! 3. every dagger of every owner, once
//! 4. every beam, once

use crate::core::timer::Millis;
use crate::game::config::CombatConfig;
use crate::game::events::{GameEvent, GameEventData, KillCause};
use crate::game::map::Wall;
use crate::game::player::{PlayerEntity, Reconciled};
use crate::game::projectile::DaggerStep;
use crate::game::world::World;

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events since the previous tick, in order (triggers first)
    pub events: Vec<GameEvent>,
    /// Daggers removed this tick
    pub daggers_removed: usize,
    /// Beams removed this tick
    pub beams_removed: usize,
}

/// Run one simulation tick of `dt_ms` milliseconds.
pub fn tick(world: &mut World, dt_ms: Millis) -> TickResult {
    let mut result = TickResult::default();

    // Triggers fired between ticks come first
    result.events.extend(world.take_events());

    // 0. Advance clock
    world.now_ms += dt_ms;

    // 1. Players
    update_players(world, dt_ms, &mut result);

    // 2. Daggers
    resolve_daggers(world, dt_ms, &mut result);

    // 3. Beams
    resolve_beams(world, dt_ms, &mut result);

    result.events.extend(world.take_events());
    result
}

/// Timers, reconciliation, respawn and movement for every player.
fn update_players(world: &mut World, dt_ms: Millis, result: &mut TickResult) {
    let now = world.now_ms;
    let World { config, map, local, remotes, .. } = &mut *world;

    for player in std::iter::once(local).chain(remotes.values_mut()) {
        update_player(player, now, dt_ms, config, map.walls(), result);
    }
}

fn update_player(
    player: &mut PlayerEntity,
    now: Millis,
    dt_ms: Millis,
    config: &CombatConfig,
    walls: &[Wall],
    result: &mut TickResult,
) {
    let player_id = player.id;

    for (ability, transitions) in player.abilities_mut().poll(now) {
        if transitions.effect_ended {
            result.events.push(GameEvent::new(now, GameEventData::DeflectEnded { player_id }));
        }
        if transitions.ready {
            result.events.push(GameEvent::new(now, GameEventData::AbilityReady { player_id, ability }));
        }
    }

    match player.reconcile(now, config.respawn_delay_ms) {
        Some(Reconciled::Killed) => result.events.push(GameEvent::new(
            now,
            GameEventData::PlayerKilled {
                victim_id: player_id,
                killer_id: None,
                cause: KillCause::Reconciled,
            },
        )),
        Some(Reconciled::Respawned) => result.events.push(GameEvent::new(
            now,
            GameEventData::PlayerRespawned { player_id, position: player.position },
        )),
        None => {}
    }

    if player.respawn_due(now) {
        player.respawn(config.spawn_point);
        result.events.push(GameEvent::new(
            now,
            GameEventData::PlayerRespawned { player_id, position: player.position },
        ));
    }

    player.update_movement(dt_ms, walls);
}

/// Step every owner's daggers once, applying impacts.
fn resolve_daggers(world: &mut World, dt_ms: Millis, result: &mut TickResult) {
    let now = world.now_ms;

    // Collect owners first to avoid borrowing players while we mutate them
    for owner_id in world.player_ids() {
        let mut daggers = match world.player_mut(owner_id) {
            Some(owner) if !owner.daggers.is_empty() => std::mem::take(&mut owner.daggers),
            _ => continue,
        };
        let before = daggers.len();

        daggers.retain_mut(|dagger| {
            let sighting = world.player(dagger.target_id).map(|p| p.sighting());
            match dagger.step(now, dt_ms, sighting) {
                DaggerStep::Flying => true,
                DaggerStep::Expired | DaggerStep::TargetLost => false,
                DaggerStep::Impact => {
                    world.kill(dagger.target_id, Some(owner_id), KillCause::Dagger);
                    false
                }
            }
        });

        result.daggers_removed += before - daggers.len();
        if let Some(owner) = world.player_mut(owner_id) {
            daggers.append(&mut owner.daggers);
            owner.daggers = daggers;
        }
    }
}

/// Step every beam once: hit test, credit kills, slide forward.
fn resolve_beams(world: &mut World, dt_ms: Millis, result: &mut TickResult) {
    let now = world.now_ms;
    let mut beams = std::mem::take(&mut world.beams);
    let before = beams.len();

    beams.retain_mut(|beam| {
        if beam.is_expired(now) {
            return false;
        }

        let touched: Vec<_> = world
            .players()
            .filter(|p| p.is_alive() && beam.touches(p.id, p.position, p.radius))
            .map(|p| p.id)
            .collect();

        for victim_id in touched {
            // Deflecting targets stay eligible for later ticks
            if world.kill(victim_id, Some(beam.owner), KillCause::Shockwave) {
                beam.record_hit(victim_id);
            }
        }

        beam.advance(dt_ms);
        true
    });

    result.beams_removed += before - beams.len();
    beams.append(&mut world.beams);
    world.beams = beams;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::Vec2;
    use crate::game::ability::{AbilityKind, AbilityRequest};
    use crate::game::map::ArenaMap;
    use crate::game::player::PlayerId;
    use crate::game::world::RemoteSnapshot;

    const FRAME: Millis = 16;

    fn open_world() -> World {
        World::new(PlayerId::new(), "me", "#ff0000", CombatConfig::default(), ArenaMap::empty())
    }

    fn add_remote(world: &mut World, x: f32, y: f32) -> PlayerId {
        let id = PlayerId::new();
        world.upsert_remote(
            id,
            RemoteSnapshot {
                name: "them".to_string(),
                color: "#0000ff".to_string(),
                position: Vec2::new(x, y),
                alive: true,
            },
        );
        id
    }

    fn kills(result: &TickResult) -> Vec<(PlayerId, Option<PlayerId>, KillCause)> {
        result
            .events
            .iter()
            .filter_map(|e| match e.data {
                GameEventData::PlayerKilled { victim_id, killer_id, cause } => Some((victim_id, killer_id, cause)),
                _ => None,
            })
            .collect()
    }

    fn run(world: &mut World, frames: usize) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..frames {
            events.extend(tick(world, FRAME).events);
        }
        events
    }

    #[test]
    fn test_tick_advances_clock() {
        let mut world = open_world();
        tick(&mut world, FRAME);
        tick(&mut world, FRAME);
        assert_eq!(world.now(), 32);
    }

    #[test]
    fn test_dagger_kills_and_is_removed() {
        let mut world = open_world();
        let victim = add_remote(&mut world, 250.0, 100.0);
        let me = world.local_id();

        world.launch_dagger(victim).unwrap();
        let events = run(&mut world, 60);

        let killed: Vec<_> = events
            .iter()
            .filter(|e| matches!(e.data, GameEventData::PlayerKilled { .. }))
            .collect();
        assert_eq!(killed.len(), 1);
        assert_eq!(
            killed[0].data,
            GameEventData::PlayerKilled { victim_id: victim, killer_id: Some(me), cause: KillCause::Dagger }
        );
        assert!(!world.remote(&victim).unwrap().is_alive());
        assert!(world.local_player().daggers.is_empty());
    }

    #[test]
    fn test_dagger_target_dies_first() {
        let mut world = open_world();
        let victim = add_remote(&mut world, 700.0, 500.0);
        let bystander = add_remote(&mut world, 400.0, 300.0);

        world.launch_dagger(victim).unwrap();
        tick(&mut world, FRAME);
        assert_eq!(world.local_player().daggers.len(), 1);

        // Relay reports the target dead before impact
        world.upsert_remote(
            victim,
            RemoteSnapshot {
                name: "them".to_string(),
                color: "#0000ff".to_string(),
                position: Vec2::new(700.0, 500.0),
                alive: false,
            },
        );
        let result = tick(&mut world, FRAME);

        assert!(world.local_player().daggers.is_empty());
        assert_eq!(result.daggers_removed, 1);
        assert!(world.remote(&bystander).unwrap().is_alive());
        // Only the reconciliation death, never a dagger kill
        assert_eq!(kills(&result), vec![(victim, None, KillCause::Reconciled)]);
    }

    #[test]
    fn test_dagger_expires_after_ttl() {
        let mut world = open_world();
        let victim = add_remote(&mut world, 400.0, 100.0);
        world.launch_dagger(victim).unwrap();

        // Keep the target out of reach by moving it every frame
        let mut removed = 0;
        for frame in 0..200u32 {
            let far = if frame % 2 == 0 { Vec2::new(5_000.0, 5_000.0) } else { Vec2::new(-5_000.0, 5_000.0) };
            world.remotes.get_mut(&victim).unwrap().position = far;
            removed += tick(&mut world, FRAME).daggers_removed;
            if world.local_player().daggers.is_empty() {
                break;
            }
        }
        assert_eq!(removed, 1);
        assert!(world.now() >= world.config().dagger_ttl_ms);
        assert!(world.remote(&victim).unwrap().is_alive());
    }

    #[test]
    fn test_shockwave_kills_each_target_once() {
        let mut world = open_world();
        // Both on the beam line, to the right of the spawn point (100, 100)
        let first = add_remote(&mut world, 160.0, 100.0);
        let second = add_remote(&mut world, 230.0, 100.0);
        let me = world.local_id();

        world.launch_shockwave(400.0, 100.0).unwrap();

        // Force the first victim straight back to life each frame
        let mut events = Vec::new();
        for _ in 0..50 {
            events.extend(tick(&mut world, FRAME).events);
            let victim = world.remotes.get_mut(&first).unwrap();
            if !victim.is_alive() {
                victim.respawn(Vec2::new(160.0, 100.0));
                victim.position = Vec2::new(300.0, 100.0);
            }
        }

        let first_kills = events
            .iter()
            .filter(|e| matches!(e.data, GameEventData::PlayerKilled { victim_id, killer_id: Some(k), cause: KillCause::Shockwave } if victim_id == first && k == me))
            .count();
        let second_kills = events
            .iter()
            .filter(|e| matches!(e.data, GameEventData::PlayerKilled { victim_id, cause: KillCause::Shockwave, .. } if victim_id == second))
            .count();
        assert_eq!(first_kills, 1);
        assert_eq!(second_kills, 1);
        assert!(world.beams().is_empty());
    }

    #[test]
    fn test_shockwave_spares_owner_and_deflecting_target() {
        let mut world = open_world();
        let shielded = add_remote(&mut world, 160.0, 100.0);
        world.trigger(shielded, AbilityRequest::Deflect).unwrap();

        world.launch_shockwave(400.0, 100.0).unwrap();
        let result = tick(&mut world, FRAME);

        assert!(kills(&result).is_empty());
        assert!(world.local_player().is_alive());
        assert!(world.remote(&shielded).unwrap().is_alive());
    }

    #[test]
    fn test_local_respawn_after_delay() {
        let mut world = open_world();
        world.move_to(300.0, 300.0);
        run(&mut world, 30);
        assert!(world.suicide());

        let events = run(&mut world, 100);
        let respawned = events
            .iter()
            .find(|e| matches!(e.data, GameEventData::PlayerRespawned { .. }))
            .expect("respawn event");
        assert!(respawned.at_ms >= 480 + world.config().respawn_delay_ms);
        assert!(world.local_player().is_alive());
        assert_eq!(world.local_player().position, world.config().spawn_point);
    }

    #[test]
    fn test_ability_ready_event() {
        let mut world = open_world();
        world.activate_deflect().unwrap();

        let events = run(&mut world, 130);
        let ended = events.iter().position(|e| matches!(e.data, GameEventData::DeflectEnded { .. }));
        let ready = events.iter().position(|e| {
            matches!(e.data, GameEventData::AbilityReady { ability: AbilityKind::Deflect, .. })
        });
        assert!(ended.is_some());
        assert!(ready.is_some());
        assert!(ended < ready);
        assert!(world.ability(AbilityKind::Deflect).is_armed(world.now()));
    }

    #[test]
    fn test_reconciliation_respawns_remote() {
        let mut world = open_world();
        let other = add_remote(&mut world, 300.0, 300.0);
        assert!(world.kill(other, Some(world.local_id()), KillCause::Dagger));

        // Still dead until the relay says otherwise
        run(&mut world, 200);
        assert!(!world.remote(&other).unwrap().is_alive());

        world.upsert_remote(
            other,
            RemoteSnapshot {
                name: "them".to_string(),
                color: "#0000ff".to_string(),
                position: Vec2::new(100.0, 100.0),
                alive: true,
            },
        );
        let result = tick(&mut world, FRAME);
        assert!(world.remote(&other).unwrap().is_alive());
        assert!(result
            .events
            .iter()
            .any(|e| e.data == GameEventData::PlayerRespawned { player_id: other, position: Vec2::new(100.0, 100.0) }));
    }
}
