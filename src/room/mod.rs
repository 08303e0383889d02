//! Persistence collaborator: room settings and card deduction.

pub mod error;
pub mod in_memory;
pub mod storage;

pub use error::RoomError;
pub use in_memory::{DeductionRecord, InMemoryRoomStorage};
pub use storage::{card_charges, DeductionStage, RoomStorage};
