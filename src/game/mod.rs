//! Match sequencing and the per-table runtime.

pub mod coordinator;
pub mod game_phases;
pub mod match_controller;

pub use game_phases::*;
pub use match_controller::*;
