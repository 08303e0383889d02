use crate::protocol::TableId;
use crate::room::RoomError;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("table {0} is closed")]
    Closed(TableId),
    #[error("table {0} not found")]
    NotFound(TableId),
    #[error("room storage: {0}")]
    Room(#[from] RoomError),
    #[error("failed to spawn table task: {0}")]
    Spawn(#[from] std::io::Error),
}
