//! # Ninja Arena
//!
//! Ability combat for a top-down multiplayer arena, plus the relay that
//! connects the players and keeps score.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        NINJA ARENA                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── vec2.rs     - 2D float vector                           │
//! │  └── timer.rs    - Polled countdown timers                   │
//! │                                                              │
//! │  game/           - Combat simulation (runs on each client)   │
//! │  ├── config.rs   - Tuning constants                          │
//! │  ├── map.rs      - Arena bounds and walls                    │
//! │  ├── collision.rs- Circle, rectangle and beam geometry       │
//! │  ├── ability.rs  - Deflect, Blink, Shockwave, Dagger         │
//! │  ├── projectile.rs - Daggers and beams in flight             │
//! │  ├── player.rs   - Movement, death, respawn, reconciliation  │
//! │  ├── world.rs    - Per-client context and trigger points     │
//! │  ├── tick.rs     - Local combat resolver                     │
//! │  └── events.rs   - What happened this tick                   │
//! │                                                              │
//! │  network/        - Networking                                │
//! │  ├── protocol.rs - JSON message types                        │
//! │  ├── registry.rs - Player records and kill scoring           │
//! │  ├── server.rs   - WebSocket relay                           │
//! │  └── client.rs   - Session adapter and transport             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Trust Model
//!
//! Every client simulates combat on its own and reports the kills it
//! makes. The relay believes those reports, counts kills, and
//! rebroadcasts the registry; clients reconcile their remote players
//! against each snapshot.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::vec2::Vec2;
pub use core::timer::{Millis, Timer};
pub use game::{AbilityKind, PlayerId, World};
pub use network::{ClientSession, RelayConfig, RelayServer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Client simulation rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Frame length at [`TICK_RATE`], in milliseconds
pub const FRAME_MS: Millis = 1000 / TICK_RATE as Millis;
