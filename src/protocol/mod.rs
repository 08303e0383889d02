//! Wire boundary: client intents in, per-player events and snapshots out.

pub mod adapter;
pub mod bot;
pub mod events;
pub mod intents;
pub mod snapshot;

pub use adapter::*;
pub use events::*;
pub use intents::*;
pub use snapshot::*;

pub type TableId = uuid::Uuid;
