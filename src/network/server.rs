//! WebSocket Relay Server
//!
//! Async WebSocket relay for arena matches. Keeps the player registry,
//! rebroadcasts it after every change, forwards ability triggers between
//! clients and announces round victories.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::game::player::PlayerId;
use crate::network::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::network::registry::{Registry, DEFAULT_VICTORY_SCORE};

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Kills needed to win a round.
    pub victory_score: u32,
    /// Delay between a victory and the score reset.
    pub reset_delay: Duration,
    /// Outgoing queue size per connection.
    pub channel_capacity: usize,
    /// Relay version string.
    pub version: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_connections: 256,
            victory_score: DEFAULT_VICTORY_SCORE,
            reset_delay: Duration::from_millis(3000),
            channel_capacity: 64,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads `HOST`, `PORT`, `VICTORY_SCORE` and `RESET_DELAY_MS`; anything
    /// missing or unparseable keeps its default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = std::env::var("HOST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| defaults.bind_addr.ip());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| defaults.bind_addr.port());

        Self {
            bind_addr: SocketAddr::new(host, port),
            victory_score: std::env::var("VICTORY_SCORE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.victory_score),
            reset_delay: std::env::var("RESET_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.reset_delay),
            ..defaults
        }
    }
}

/// Relay server errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection limit reached.
    #[error("Connection limit reached")]
    ConnectionLimitReached,
}

type ClientMap = BTreeMap<PlayerId, mpsc::Sender<ServerMessage>>;

/// Queue `msg` for every client except `skip`. Full queues drop the message.
fn fan_out(clients: &ClientMap, msg: &ServerMessage, skip: Option<PlayerId>) {
    for (id, sender) in clients {
        if Some(*id) == skip {
            continue;
        }
        match sender.try_send(msg.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(player = %id.short(), "Outgoing queue full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(player = %id.short(), "Outgoing queue closed");
            }
        }
    }
}

/// Shared relay state: the registry and every connection's outgoing queue.
///
/// Locks are always taken registry first, then clients. A message is
/// applied and its broadcast queued under one registry write guard, so
/// every client sees mutations in the order they were applied.
#[derive(Clone)]
pub struct RelayState {
    config: Arc<RelayConfig>,
    registry: Arc<RwLock<Registry>>,
    clients: Arc<RwLock<ClientMap>>,
}

impl RelayState {
    /// Create empty state.
    pub fn new(config: RelayConfig) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::new(config.victory_score))),
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            config: Arc::new(config),
        }
    }

    /// Relay configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Register a connection's outgoing queue and greet it.
    pub async fn connect(&self, id: PlayerId, sender: mpsc::Sender<ServerMessage>) -> Result<(), RelayError> {
        let mut clients = self.clients.write().await;
        if clients.len() >= self.config.max_connections {
            return Err(RelayError::ConnectionLimitReached);
        }
        let welcome = ServerMessage::Welcome {
            id,
            version: self.config.version.clone(),
        };
        if sender.try_send(welcome).is_err() {
            warn!(player = %id.short(), "Could not queue welcome");
        }
        clients.insert(id, sender);
        Ok(())
    }

    /// Apply one client message.
    pub async fn handle_message(&self, id: PlayerId, msg: ClientMessage) {
        let mut registry = self.registry.write().await;

        match msg {
            ClientMessage::Join(request) => {
                info!(player = %id.short(), name = %request.name, "Join");
                registry.join(id, request);
            }
            ClientMessage::Move { x, y } => {
                if let Err(e) = registry.apply_move(id, x, y) {
                    debug!("Move ignored: {}", e);
                    return;
                }
            }
            ClientMessage::Update(request) => {
                let victory = registry.apply_update(id, request);
                let clients = self.clients.read().await;
                fan_out(&clients, &ServerMessage::State { players: registry.snapshot() }, None);
                if let Some(victory) = victory {
                    fan_out(&clients, &ServerMessage::Victory(victory), None);
                    self.schedule_reset();
                }
                return;
            }
            ClientMessage::Ability(relay) => {
                debug!(player = %id.short(), ability = ?relay.ability, "Relaying ability");
                let clients = self.clients.read().await;
                fan_out(&clients, &ServerMessage::ability(id, relay), Some(id));
                return;
            }
        }

        let clients = self.clients.read().await;
        fan_out(&clients, &ServerMessage::State { players: registry.snapshot() }, None);
    }

    /// Forget a connection and tell everyone else.
    pub async fn disconnect(&self, id: PlayerId) {
        let mut registry = self.registry.write().await;
        registry.remove(id);
        let mut clients = self.clients.write().await;
        clients.remove(&id);
        fan_out(&clients, &ServerMessage::State { players: registry.snapshot() }, None);
    }

    /// Zero all scores after the reset delay and rebroadcast.
    fn schedule_reset(&self) {
        let state = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(state.config.reset_delay).await;
            let mut registry = state.registry.write().await;
            registry.reset_scores();
            let clients = state.clients.read().await;
            fan_out(&clients, &ServerMessage::State { players: registry.snapshot() }, None);
            info!("Scores reset");
        });
    }

    /// Read access to the registry.
    pub async fn registry(&self) -> tokio::sync::RwLockReadGuard<'_, Registry> {
        self.registry.read().await
    }

    /// Number of open connections.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

/// The relay server.
pub struct RelayServer {
    /// Shared state.
    state: RelayState,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl RelayServer {
    /// Create a new relay server.
    pub fn new(config: RelayConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            state: RelayState::new(config),
            shutdown_tx,
        }
    }

    /// Shared state handle.
    pub fn state(&self) -> &RelayState {
        &self.state
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<(), RelayError> {
        let listener = TcpListener::bind(self.state.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), RelayError> {
        info!("Relay listening on {}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let state = self.state.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(state.config.channel_capacity);
            let id = PlayerId::new();

            if let Err(e) = state.connect(id, msg_tx.clone()).await {
                warn!("Rejecting {}: {}", addr, e);
                let reply = ServerMessage::error(ErrorCode::ServerFull, e.to_string());
                if let Ok(text) = reply.to_json() {
                    let _ = ws_sender.send(Message::Text(text)).await;
                }
                let _ = ws_sender.close().await;
                return;
            }
            info!(player = %id.short(), "Client connected from {}", addr);

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => state.handle_message(id, client_msg).await,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = msg_tx.send(ServerMessage::error(
                                            ErrorCode::InvalidMessage,
                                            e.to_string(),
                                        )).await;
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!("WebSocket error from {}: {}", addr, e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }

            state.disconnect(id).await;
            sender_task.abort();
            info!(player = %id.short(), "Client disconnected");
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.state.connection_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ability::AbilityKind;
    use crate::network::protocol::{AbilityRelay, JoinRequest, UpdateRequest, Victory};

    fn join(x: f32, y: f32, name: &str) -> ClientMessage {
        ClientMessage::Join(JoinRequest {
            x,
            y,
            name: name.to_string(),
            color: None,
        })
    }

    async fn connected(state: &RelayState) -> (PlayerId, mpsc::Receiver<ServerMessage>) {
        let id = PlayerId::new();
        let (tx, mut rx) = mpsc::channel(64);
        state.connect(id, tx).await.unwrap();
        match rx.recv().await {
            Some(ServerMessage::Welcome { id: welcomed, .. }) => assert_eq!(welcomed, id),
            other => panic!("Expected welcome, got {:?}", other),
        }
        (id, rx)
    }

    #[test]
    fn test_relay_config_default() {
        let config = RelayConfig::default();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.victory_score, 5);
        assert_eq!(config.reset_delay, Duration::from_millis(3000));
        assert_eq!(config.channel_capacity, 64);
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = RelayConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = RelayServer::new(config);
        assert_eq!(server.connection_count().await, 0);
        assert!(server.state().registry().await.is_empty());
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let server = RelayServer::new(RelayConfig::default());
        server.shutdown();
        // Should not panic
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let server = Arc::new(RelayServer::new(RelayConfig::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let handle = {
            let server = server.clone();
            tokio::spawn(async move { server.serve(listener).await })
        };
        tokio::task::yield_now().await;
        server.shutdown();
        // A send before the loop subscribed is lost; keep signalling until it exits
        let result = loop {
            if handle.is_finished() {
                break handle.await.unwrap();
            }
            server.shutdown();
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let state = RelayState::new(RelayConfig {
            max_connections: 1,
            ..Default::default()
        });
        let (_a, _rx) = connected(&state).await;

        let (tx, _rx2) = mpsc::channel(4);
        let err = state.connect(PlayerId::new(), tx).await.unwrap_err();
        assert!(matches!(err, RelayError::ConnectionLimitReached));
        assert_eq!(state.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_join_and_disconnect_broadcast_state() {
        let state = RelayState::new(RelayConfig::default());
        let (x, mut rx_x) = connected(&state).await;
        let (y, mut rx_y) = connected(&state).await;

        state.handle_message(x, join(10.0, 10.0, "x")).await;
        state.handle_message(y, join(20.0, 20.0, "y")).await;

        // Both see both joins
        for rx in [&mut rx_x, &mut rx_y] {
            let _first = rx.recv().await.unwrap();
            match rx.recv().await.unwrap() {
                ServerMessage::State { players } => {
                    assert_eq!(players.len(), 2);
                    assert!(players.contains_key(&x) && players.contains_key(&y));
                }
                other => panic!("Expected state, got {:?}", other),
            }
        }

        state.disconnect(x).await;
        match rx_y.recv().await.unwrap() {
            ServerMessage::State { players } => {
                assert_eq!(players.len(), 1);
                assert!(players.contains_key(&y));
            }
            other => panic!("Expected state, got {:?}", other),
        }
        assert_eq!(state.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_move_from_unjoined_is_ignored() {
        let state = RelayState::new(RelayConfig::default());
        let (x, mut rx) = connected(&state).await;

        state.handle_message(x, ClientMessage::Move { x: 1.0, y: 1.0 }).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ability_relayed_to_others_only() {
        let state = RelayState::new(RelayConfig::default());
        let (a, mut rx_a) = connected(&state).await;
        let (_b, mut rx_b) = connected(&state).await;

        let relay = AbilityRelay {
            ability: AbilityKind::Shockwave,
            x: Some(300.0),
            y: Some(200.0),
            target_id: None,
        };
        state.handle_message(a, ClientMessage::Ability(relay)).await;

        assert_eq!(rx_b.recv().await.unwrap(), ServerMessage::ability(a, relay));
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_queue_drops_message() {
        let state = RelayState::new(RelayConfig::default());
        let id = PlayerId::new();
        let (tx, mut rx) = mpsc::channel(1);
        state.connect(id, tx).await.unwrap();

        // Queue holds the welcome; the state broadcast is dropped
        state.handle_message(id, join(0.0, 0.0, "slow")).await;
        assert!(matches!(rx.recv().await, Some(ServerMessage::Welcome { .. })));
        assert!(rx.try_recv().is_err());
        assert_eq!(state.registry().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_victory_then_reset_after_delay() {
        let state = RelayState::new(RelayConfig::default());
        let (killer, mut rx) = connected(&state).await;
        let (victim, _rx_victim) = connected(&state).await;

        state.handle_message(killer, join(0.0, 0.0, "ninja")).await;
        state.handle_message(victim, join(50.0, 50.0, "victim")).await;
        let _ = rx.recv().await;
        let _ = rx.recv().await;

        let kill = ClientMessage::Update(UpdateRequest {
            id: Some(victim),
            alive: Some(false),
            killer_id: Some(killer),
            ..Default::default()
        });

        for _ in 0..4 {
            state.handle_message(killer, kill.clone()).await;
            assert!(matches!(rx.recv().await, Some(ServerMessage::State { .. })));
        }
        assert_eq!(state.registry().await.get(killer).unwrap().score, 4);

        state.handle_message(killer, kill.clone()).await;
        match rx.recv().await.unwrap() {
            ServerMessage::State { players } => assert_eq!(players[&killer].score, 5),
            other => panic!("Expected state, got {:?}", other),
        }
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerMessage::Victory(Victory { winner: "ninja".to_string(), score: 5 })
        );

        tokio::time::advance(Duration::from_millis(2900)).await;
        assert_eq!(state.registry().await.get(killer).unwrap().score, 5);

        match rx.recv().await.unwrap() {
            ServerMessage::State { players } => {
                assert!(players.values().all(|r| r.score == 0));
            }
            other => panic!("Expected state, got {:?}", other),
        }
        assert!(!state.registry().await.is_round_over());
    }
}
