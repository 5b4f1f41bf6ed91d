//! Network Layer
//!
//! WebSocket relay and the client adapter that talks to it.
//! The relay never simulates combat; all game logic runs through `game/`.

pub mod protocol;
pub mod registry;
pub mod server;
pub mod client;

pub use protocol::{
    AbilityRelay, ClientMessage, ServerMessage, PlayerRecord, ProtocolError, Victory,
};
pub use registry::{Registry, RegistryError};
pub use server::{RelayConfig, RelayError, RelayServer, RelayState};
pub use client::{connect, ClientError, ClientNotice, ClientSession, RelayConnection};
