use crate::engine::tw::PlayerId;
use crate::protocol::TableId;

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(TableId),
    #[error("player {player} holds {available} cards but {required} are due")]
    InsufficientCards {
        player: PlayerId,
        available: u32,
        required: u32,
    },
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl RoomError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
