//! Game Events
//!
//! What the combat engine did, in order. The simulation never talks to the
//! network; the client adapter reads these to decide what to relay, and
//! presentation layers read them for sounds and effects.

use serde::{Serialize, Deserialize};

use crate::core::timer::Millis;
use crate::core::vec2::Vec2;
use crate::game::ability::{AbilityError, AbilityKind, AbilityUse, Feedback};
use crate::game::player::PlayerId;

/// How a player died.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillCause {
    /// Dagger impact.
    Dagger,
    /// Shockwave beam.
    Shockwave,
    /// The relay reported the player dead.
    Reconciled,
    /// The player killed itself.
    SelfInflicted,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// A trigger succeeded
    AbilityUsed {
        player_id: PlayerId,
        ability: AbilityUse,
    },

    /// A trigger was rejected; nothing changed
    AbilityRejected {
        player_id: PlayerId,
        ability: AbilityKind,
        reason: AbilityError,
    },

    /// Deflect's invulnerability window closed
    DeflectEnded {
        player_id: PlayerId,
    },

    /// A cooldown finished
    AbilityReady {
        player_id: PlayerId,
        ability: AbilityKind,
    },

    /// A player died
    PlayerKilled {
        victim_id: PlayerId,
        killer_id: Option<PlayerId>,
        cause: KillCause,
    },

    /// A player came back at the spawn point
    PlayerRespawned {
        player_id: PlayerId,
        position: Vec2,
    },
}

/// A game event stamped with the simulation time it happened at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Simulation time
    pub at_ms: Millis,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(at_ms: Millis, data: GameEventData) -> Self {
        Self { at_ms, data }
    }

    /// The player this event is mainly about.
    pub fn player_id(&self) -> PlayerId {
        match &self.data {
            GameEventData::AbilityUsed { player_id, .. }
            | GameEventData::AbilityRejected { player_id, .. }
            | GameEventData::DeflectEnded { player_id }
            | GameEventData::AbilityReady { player_id, .. }
            | GameEventData::PlayerRespawned { player_id, .. } => *player_id,
            GameEventData::PlayerKilled { victim_id, .. } => *victim_id,
        }
    }

    /// Feedback cue, for rejected triggers.
    pub fn feedback(&self) -> Option<Feedback> {
        match &self.data {
            GameEventData::AbilityRejected { reason, .. } => Some(reason.feedback()),
            _ => None,
        }
    }
}
