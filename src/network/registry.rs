//! Player Registry
//!
//! The relay's authoritative view of who is connected, where they last
//! said they were, and how many kills they have this round. Pure and
//! synchronous; the server owns it behind a lock.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::game::player::PlayerId;
use crate::network::protocol::{JoinRequest, PlayerRecord, UpdateRequest, Victory, DEFAULT_COLOR};

/// Kills needed to win a round.
pub const DEFAULT_VICTORY_SCORE: u32 = 5;

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No record under this id.
    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),
}

/// All registered players.
#[derive(Debug, Clone)]
pub struct Registry {
    players: BTreeMap<PlayerId, PlayerRecord>,
    victory_score: u32,
    round_over: bool,
}

impl Registry {
    /// Create an empty registry.
    pub fn new(victory_score: u32) -> Self {
        Self {
            players: BTreeMap::new(),
            victory_score,
            round_over: false,
        }
    }

    /// Kills needed to win.
    pub fn victory_score(&self) -> u32 {
        self.victory_score
    }

    /// Whether a victory was announced and the reset has not happened yet.
    pub fn is_round_over(&self) -> bool {
        self.round_over
    }

    /// Register a player. Rejoining replaces the record and zeroes the score.
    pub fn join(&mut self, id: PlayerId, request: JoinRequest) {
        let color = request.color.unwrap_or_else(|| DEFAULT_COLOR.to_string());
        debug!(player = %id.short(), name = %request.name, "Player joined");
        self.players.insert(id, PlayerRecord {
            x: request.x,
            y: request.y,
            name: request.name,
            color,
            alive: true,
            score: 0,
        });
    }

    /// Record a new position.
    pub fn apply_move(&mut self, id: PlayerId, x: f32, y: f32) -> Result<(), RegistryError> {
        let record = self.players.get_mut(&id).ok_or(RegistryError::UnknownPlayer(id))?;
        record.x = x;
        record.y = y;
        Ok(())
    }

    /// Merge an update into `request.id` (or the sender's record) and
    /// credit the killer if one is named.
    ///
    /// Returns the victory when this update brought the killer to the
    /// winning score. A round announces at most one victory.
    pub fn apply_update(&mut self, sender: PlayerId, request: UpdateRequest) -> Option<Victory> {
        let target = request.id.unwrap_or(sender);

        if let Some(record) = self.players.get_mut(&target) {
            if let Some(alive) = request.alive {
                record.alive = alive;
            }
            if let Some(x) = request.x {
                record.x = x;
            }
            if let Some(y) = request.y {
                record.y = y;
            }
        } else {
            debug!(target = %target.short(), "Update for unknown player ignored");
        }

        let killer_id = request.killer_id?;
        if request.alive != Some(false) {
            return None;
        }
        let killer = self.players.get_mut(&killer_id)?;
        killer.score += 1;
        debug!(killer = %killer_id.short(), score = killer.score, "Kill credited");

        if killer.score >= self.victory_score && !self.round_over {
            self.round_over = true;
            info!(winner = %killer.name, score = killer.score, "Victory");
            return Some(Victory {
                winner: killer.name.clone(),
                score: killer.score,
            });
        }
        None
    }

    /// Forget a player.
    pub fn remove(&mut self, id: PlayerId) -> Option<PlayerRecord> {
        self.players.remove(&id)
    }

    /// Zero every score and open a new round.
    pub fn reset_scores(&mut self) {
        for record in self.players.values_mut() {
            record.score = 0;
        }
        self.round_over = false;
    }

    /// Copy of every record, for a `state` broadcast.
    pub fn snapshot(&self) -> BTreeMap<PlayerId, PlayerRecord> {
        self.players.clone()
    }

    /// Look up one record.
    pub fn get(&self, id: PlayerId) -> Option<&PlayerRecord> {
        self.players.get(&id)
    }

    /// Number of registered players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True when nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DEFAULT_VICTORY_SCORE)
    }
}
