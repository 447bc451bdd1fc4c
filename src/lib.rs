//! Per-frame simulation core of an arcade space shooter.
//!
//! The renderer, input device and audio are collaborators outside this
//! crate: they feed [`compute::Input`] into [`compute::Game::tick`] and read
//! back the [`compute::Snapshot`] and [`events::GameEvent`] queue.

pub mod collision;
pub mod compute;
pub mod config;
pub mod entities;
pub mod events;
pub mod ships;
pub mod spawning;

pub use compute::{FrameResult, Game, Input, Snapshot};
pub use config::{ConfigError, GameConfig};
