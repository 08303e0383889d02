//! Authoritative table engine for 16-tile Taiwanese mahjong.

pub mod config;
pub mod engine;
pub mod game;
pub mod protocol;
pub mod room;
pub mod telemetry;
pub mod tokio_tools;

#[cfg(test)]
pub mod test_utils;

pub use config::{EngineConfig, RoomSettings};
pub use game::coordinator::{TableError, TableRegistry};
pub use protocol::{IntentEnvelope, ProtocolAdapter, ProtocolEvent, TableId};
