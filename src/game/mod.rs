//! Game Logic Module
//!
//! Client-side combat simulation. Never touches the network.
//!
//! ## Module Structure
//!
//! - `config`: Combat tuning constants
//! - `map`: Arena bounds and wall rectangles
//! - `collision`: Circle/rectangle, beam and pursuit geometry
//! - `ability`: The four ability state machines
//! - `projectile`: Daggers and beams in flight
//! - `player`: Player entity, movement, death and respawn
//! - `world`: Per-client context and trigger points
//! - `tick`: Local combat resolver
//! - `events`: What happened, for the network adapter and presentation

pub mod config;
pub mod map;
pub mod collision;
pub mod ability;
pub mod projectile;
pub mod player;
pub mod world;
pub mod tick;
pub mod events;

// Re-export key types
pub use ability::{AbilityError, AbilityKind, AbilityRequest, AbilityUse, Feedback};
pub use config::CombatConfig;
pub use events::{GameEvent, GameEventData, KillCause};
pub use map::{ArenaMap, Wall};
pub use player::{PlayerEntity, PlayerId};
pub use tick::{tick, TickResult};
pub use world::{RemoteSnapshot, World};
