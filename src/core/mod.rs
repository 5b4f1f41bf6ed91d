//! Core primitives.
//!
//! Plain vector math and polled countdown timers shared by the combat
//! engine. Nothing here knows about players or the network.

pub mod vec2;
pub mod timer;

// Re-export core types
pub use vec2::Vec2;
pub use timer::{Millis, Timer};
