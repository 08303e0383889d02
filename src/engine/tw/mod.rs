pub mod actions;
pub mod claims;
pub mod engine;
pub mod errors;
pub mod events;
pub mod hand;
pub mod legals;
pub mod scoring;
pub mod seating;
pub mod state;
pub mod tiles;
pub mod ting;
pub mod types;
pub mod validator;
pub mod wall;

pub use actions::*;
pub use claims::*;
pub use engine::*;
pub use errors::*;
pub use events::*;
pub use hand::*;
pub use legals::*;
pub use scoring::*;
pub use seating::*;
pub use state::*;
pub use tiles::*;
pub use ting::*;
pub use types::*;
pub use validator::*;
pub use wall::*;
