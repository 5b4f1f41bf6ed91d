//! Protocol Messages
//!
//! Wire format for client-relay communication over WebSocket.
//! Every message is a JSON text frame carrying a `type` tag; the field set
//! of each kind is fixed and checked on receipt.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::ability::{AbilityKind, AbilityRequest, AbilityUse};
use crate::game::player::PlayerId;

/// Longest accepted nickname, in characters.
pub const MAX_NAME_LEN: usize = 16;

/// Color given to players who join without one.
pub const DEFAULT_COLOR: &str = "#00ff00";

/// Protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Not valid JSON, or the wrong shape for its `type`.
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A coordinate was NaN or infinite.
    #[error("Coordinate is not finite")]
    NonFiniteCoordinate,

    /// Nickname longer than [`MAX_NAME_LEN`].
    #[error("Name too long ({0} chars)")]
    NameTooLong(usize),

    /// Color is not `#rrggbb`.
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// An ability message lacks a field its kind needs.
    #[error("{ability:?} requires `{field}`")]
    MissingField {
        /// Ability kind.
        ability: AbilityKind,
        /// Missing field name.
        field: &'static str,
    },
}

fn check_finite(values: &[f32]) -> Result<(), ProtocolError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ProtocolError::NonFiniteCoordinate)
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Register this connection as a player.
    Join(JoinRequest),

    /// Sender moved.
    Move {
        /// New x.
        x: f32,
        /// New y.
        y: f32,
    },

    /// Merge fields into a record (the sender's unless `id` is given).
    Update(UpdateRequest),

    /// Sender triggered an ability; relayed to everyone else.
    Ability(AbilityRelay),
}

/// Join request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Starting x.
    pub x: f32,
    /// Starting y.
    pub y: f32,
    /// Nickname.
    #[serde(default)]
    pub name: String,
    /// Display color (`#rrggbb`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Shallow-merge update for a player record.
///
/// `killer_id` together with `alive: false` credits the killer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Record to update; defaults to the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PlayerId>,
    /// New life state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alive: Option<bool>,
    /// New x.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    /// New y.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Who made the kill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub killer_id: Option<PlayerId>,
}

/// An ability trigger as it travels over the wire.
///
/// `x`/`y` carry the blink destination, the shockwave aim point, or the
/// dagger launch point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbilityRelay {
    /// Which ability.
    pub ability: AbilityKind,
    /// Point x.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    /// Point y.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Dagger target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<PlayerId>,
}

impl AbilityRelay {
    fn point(&self) -> Option<Vec2> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Vec2::new(x, y)),
            _ => None,
        }
    }

    fn require_point(&self) -> Result<Vec2, ProtocolError> {
        self.point().ok_or(ProtocolError::MissingField {
            ability: self.ability,
            field: "x/y",
        })
    }

    /// Check coordinates and required fields.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        check_finite(&[self.x.unwrap_or(0.0), self.y.unwrap_or(0.0)])?;
        self.to_request().map(|_| ())
    }

    /// Rebuild the trigger request this relay describes.
    pub fn to_request(&self) -> Result<AbilityRequest, ProtocolError> {
        Ok(match self.ability {
            AbilityKind::Deflect => AbilityRequest::Deflect,
            AbilityKind::Blink => AbilityRequest::Blink { destination: self.require_point()? },
            AbilityKind::Shockwave => AbilityRequest::Shockwave { target: self.require_point()? },
            AbilityKind::Dagger => AbilityRequest::Dagger {
                target_id: self.target_id.ok_or(ProtocolError::MissingField {
                    ability: AbilityKind::Dagger,
                    field: "target_id",
                })?,
                origin: self.point(),
            },
        })
    }
}

impl From<AbilityUse> for AbilityRelay {
    fn from(used: AbilityUse) -> Self {
        let (point, target_id) = match used {
            AbilityUse::Deflect => (None, None),
            AbilityUse::Blink { destination } => (Some(destination), None),
            AbilityUse::Shockwave { target } => (Some(target), None),
            AbilityUse::Dagger { target_id, origin } => (Some(origin), Some(target_id)),
        };
        Self {
            ability: used.kind(),
            x: point.map(|p| p.x),
            y: point.map(|p| p.y),
            target_id,
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from relay to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message on every connection.
    Welcome {
        /// The connection's player id.
        id: PlayerId,
        /// Relay version.
        version: String,
    },

    /// Full registry snapshot.
    State {
        /// Every registered player.
        players: BTreeMap<PlayerId, PlayerRecord>,
    },

    /// Another player's ability trigger.
    Ability {
        /// Who triggered it.
        from: PlayerId,
        /// Which ability.
        ability: AbilityKind,
        /// Point x.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        x: Option<f32>,
        /// Point y.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        y: Option<f32>,
        /// Dagger target.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_id: Option<PlayerId>,
    },

    /// Someone reached the winning score.
    Victory(Victory),

    /// Message rejected.
    Error(ServerError),
}

/// A player as the relay knows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Last reported x.
    pub x: f32,
    /// Last reported y.
    pub y: f32,
    /// Nickname.
    pub name: String,
    /// Display color.
    pub color: String,
    /// Last reported life state.
    pub alive: bool,
    /// Kills this round.
    pub score: u32,
}

/// Victory announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Victory {
    /// Winner's nickname.
    pub winner: String,
    /// Winning score.
    pub score: u32,
}

/// Server error details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unparseable or invalid message.
    InvalidMessage,
    /// Relay is full.
    ServerFull,
}

impl ServerMessage {
    /// Relay an ability trigger on behalf of `from`.
    pub fn ability(from: PlayerId, relay: AbilityRelay) -> Self {
        ServerMessage::Ability {
            from,
            ability: relay.ability,
            x: relay.x,
            y: relay.y,
            target_id: relay.target_id,
        }
    }

    /// Error reply.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError { code, message: message.into() })
    }
}

// =============================================================================
// SERIALIZATION & VALIDATION
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string and validate.
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        let msg: Self = serde_json::from_str(s)?;
        msg.validate()?;
        Ok(msg)
    }

    /// Check field contents.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            ClientMessage::Join(join) => {
                check_finite(&[join.x, join.y])?;
                let len = join.name.chars().count();
                if len > MAX_NAME_LEN {
                    return Err(ProtocolError::NameTooLong(len));
                }
                match &join.color {
                    Some(color) if !is_hex_color(color) => Err(ProtocolError::InvalidColor(color.clone())),
                    _ => Ok(()),
                }
            }
            ClientMessage::Move { x, y } => check_finite(&[*x, *y]),
            ClientMessage::Update(update) => {
                check_finite(&[update.x.unwrap_or(0.0), update.y.unwrap_or(0.0)])
            }
            ClientMessage::Ability(relay) => relay.validate(),
        }
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(s)?)
    }
}
