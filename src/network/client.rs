//! Relay Client
//!
//! Adapter between the combat simulation and the relay. `ClientSession`
//! feeds relay messages into a `World` and turns the world's events into
//! the messages this client must send; `connect` is the WebSocket
//! transport.

use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::core::timer::Millis;
use crate::core::vec2::Vec2;
use crate::game::ability::{AbilityError, AbilityRequest};
use crate::game::config::CombatConfig;
use crate::game::events::{GameEventData, KillCause};
use crate::game::map::ArenaMap;
use crate::game::player::PlayerId;
use crate::game::tick::tick;
use crate::game::world::{RemoteSnapshot, World};
use crate::network::protocol::{
    AbilityRelay, ClientMessage, JoinRequest, PlayerRecord, ServerError, ServerMessage,
    UpdateRequest, Victory,
};

/// Attempts made for a replay whose sender is not known yet.
pub const REPLAY_ATTEMPTS: u32 = 5;

/// Spacing between replay attempts.
pub const REPLAY_RETRY_MS: Millis = 100;

/// Client transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The relay closed before greeting us.
    #[error("Connection closed before welcome")]
    ClosedBeforeWelcome,

    /// First message was not a welcome.
    #[error("Unexpected first message: {0:?}")]
    UnexpectedMessage(Box<ServerMessage>),
}

/// Something the presentation layer should show.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientNotice {
    /// A round was won.
    Victory(Victory),
    /// The relay rejected one of our messages.
    ServerError(ServerError),
}

#[derive(Debug, Clone, Copy)]
struct PendingReplay {
    from: PlayerId,
    request: AbilityRequest,
    attempts: u32,
    next_attempt_at: Millis,
}

impl From<&PlayerRecord> for RemoteSnapshot {
    fn from(record: &PlayerRecord) -> Self {
        Self {
            name: record.name.clone(),
            color: record.color.clone(),
            position: Vec2::new(record.x, record.y),
            alive: record.alive,
        }
    }
}

/// One client's view of the match.
#[derive(Debug)]
pub struct ClientSession {
    world: World,
    last_sent_position: Option<Vec2>,
    pending: Vec<PendingReplay>,
    scoreboard: BTreeMap<PlayerId, PlayerRecord>,
}

impl ClientSession {
    /// Create a session for the id the relay welcomed us with.
    pub fn new(id: PlayerId, name: &str, color: &str, config: CombatConfig, map: ArenaMap) -> Self {
        Self {
            world: World::new(id, name, color, config, map),
            last_sent_position: None,
            pending: Vec::new(),
            scoreboard: BTreeMap::new(),
        }
    }

    /// Local simulation.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Local simulation, for input handling.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The `join` message announcing the local player.
    pub fn join_message(&mut self) -> ClientMessage {
        let local = self.world.local_player();
        self.last_sent_position = Some(local.position);
        ClientMessage::Join(JoinRequest {
            x: local.position.x,
            y: local.position.y,
            name: local.name.clone(),
            color: Some(local.color.clone()),
        })
    }

    /// Replays waiting for an unknown sender to appear.
    pub fn pending_replays(&self) -> usize {
        self.pending.len()
    }

    /// Records from the last snapshot, best score first.
    pub fn scoreboard(&self) -> Vec<(PlayerId, &PlayerRecord)> {
        let mut rows: Vec<_> = self.scoreboard.iter().map(|(id, r)| (*id, r)).collect();
        rows.sort_by(|a, b| b.1.score.cmp(&a.1.score).then_with(|| a.1.name.cmp(&b.1.name)));
        rows
    }

    /// Apply one relay message.
    pub fn handle_server_message(&mut self, msg: ServerMessage) -> Option<ClientNotice> {
        match msg {
            ServerMessage::Welcome { id, version } => {
                debug!("Welcome as {} (relay {})", id, version);
                None
            }
            ServerMessage::State { players } => {
                for (id, record) in &players {
                    self.world.upsert_remote(*id, record.into());
                }
                self.world.retain_remotes(|id| players.contains_key(id));
                self.scoreboard = players;
                None
            }
            ServerMessage::Ability { from, ability, x, y, target_id } => {
                if from == self.world.local_id() {
                    return None;
                }
                let relay = AbilityRelay { ability, x, y, target_id };
                match relay.to_request() {
                    Ok(request) => self.replay(from, request),
                    Err(e) => debug!("Bad relayed ability from {}: {}", from.short(), e),
                }
                None
            }
            ServerMessage::Victory(victory) => {
                info!(winner = %victory.winner, score = victory.score, "Round won");
                Some(ClientNotice::Victory(victory))
            }
            ServerMessage::Error(error) => {
                warn!("Relay rejected a message: {}", error.message);
                Some(ClientNotice::ServerError(error))
            }
        }
    }

    fn replay(&mut self, from: PlayerId, request: AbilityRequest) {
        match self.world.trigger(from, request) {
            Ok(_) => {}
            Err(AbilityError::UnknownPlayer) => {
                debug!("Ability from unknown player {}, retrying", from.short());
                self.pending.push(PendingReplay {
                    from,
                    request,
                    attempts: 1,
                    next_attempt_at: self.world.now() + REPLAY_RETRY_MS,
                });
            }
            Err(e) => debug!("Replay from {} rejected: {}", from.short(), e),
        }
    }

    fn retry_pending(&mut self) {
        let now = self.world.now();
        let world = &mut self.world;
        self.pending.retain_mut(|pending| {
            if now < pending.next_attempt_at {
                return true;
            }
            match world.trigger(pending.from, pending.request) {
                Err(AbilityError::UnknownPlayer) => {
                    pending.attempts += 1;
                    if pending.attempts >= REPLAY_ATTEMPTS {
                        debug!("Dropping replay from {} after {} attempts", pending.from.short(), pending.attempts);
                        return false;
                    }
                    pending.next_attempt_at = now + REPLAY_RETRY_MS;
                    true
                }
                Err(e) => {
                    debug!("Retried replay from {} rejected: {}", pending.from.short(), e);
                    false
                }
                Ok(_) => false,
            }
        });
    }

    /// Advance the simulation and collect the messages to send.
    pub fn tick(&mut self, dt_ms: Millis) -> Vec<ClientMessage> {
        self.retry_pending();
        let result = tick(&mut self.world, dt_ms);
        let me = self.world.local_id();
        let mut outgoing = Vec::new();

        for event in result.events {
            match event.data {
                GameEventData::AbilityUsed { player_id, ability } if player_id == me => {
                    outgoing.push(ClientMessage::Ability(AbilityRelay::from(ability)));
                }
                GameEventData::PlayerKilled { victim_id, killer_id: Some(killer), .. } if killer == me => {
                    outgoing.push(ClientMessage::Update(UpdateRequest {
                        id: Some(victim_id),
                        alive: Some(false),
                        killer_id: Some(me),
                        ..Default::default()
                    }));
                }
                GameEventData::PlayerKilled { victim_id, cause: KillCause::SelfInflicted, .. } if victim_id == me => {
                    outgoing.push(ClientMessage::Update(UpdateRequest {
                        alive: Some(false),
                        ..Default::default()
                    }));
                }
                GameEventData::PlayerRespawned { player_id, position } if player_id == me => {
                    self.last_sent_position = Some(position);
                    outgoing.push(ClientMessage::Update(UpdateRequest {
                        alive: Some(true),
                        x: Some(position.x),
                        y: Some(position.y),
                        ..Default::default()
                    }));
                }
                _ => {}
            }
        }

        let local = self.world.local_player();
        if local.is_alive() && self.last_sent_position != Some(local.position) {
            self.last_sent_position = Some(local.position);
            outgoing.push(ClientMessage::Move { x: local.position.x, y: local.position.y });
        }

        outgoing
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// An open relay connection.
#[derive(Debug)]
pub struct RelayConnection {
    /// Id the relay assigned.
    pub id: PlayerId,
    /// Relay version.
    pub version: String,
    /// Messages to send.
    pub outgoing: mpsc::Sender<ClientMessage>,
    /// Messages received after the welcome.
    pub incoming: mpsc::Receiver<ServerMessage>,
}

/// Connect to a relay and wait for its welcome.
pub async fn connect(url: &str) -> Result<RelayConnection, ClientError> {
    info!("Connecting to {}...", url);
    let (ws_stream, _) = connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();

    let (id, version) = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => match ServerMessage::from_json(&text) {
                Ok(ServerMessage::Welcome { id, version }) => break (id, version),
                Ok(other) => return Err(ClientError::UnexpectedMessage(Box::new(other))),
                Err(e) => warn!("Failed to parse server message: {}", e),
            },
            Some(Ok(Message::Close(_))) | None => return Err(ClientError::ClosedBeforeWelcome),
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    };
    info!("Connected as {}", id.short());

    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<ClientMessage>(100);
    let (incoming_tx, incoming_rx) = mpsc::channel::<ServerMessage>(100);

    // Reader task
    tokio::spawn(async move {
        while let Some(msg_result) = read.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match ServerMessage::from_json(&text) {
                    Ok(msg) => {
                        if incoming_tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to parse server message: {}", e),
                },
                Ok(Message::Close(_)) => {
                    debug!("Server closed connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket read error: {}", e);
                    break;
                }
            }
        }
    });

    // Writer task
    tokio::spawn(async move {
        while let Some(msg) = outgoing_rx.recv().await {
            let text = match msg.to_json() {
                Ok(t) => t,
                Err(e) => {
                    warn!("Failed to serialize message: {}", e);
                    continue;
                }
            };
            if let Err(e) = write.send(Message::Text(text)).await {
                warn!("Failed to send message: {}", e);
                break;
            }
        }
        let _ = write.close().await;
    });

    Ok(RelayConnection {
        id,
        version,
        outgoing: outgoing_tx,
        incoming: incoming_rx,
    })
}
