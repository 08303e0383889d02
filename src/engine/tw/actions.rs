use serde::{Deserialize, Serialize};

use super::tiles::Tile;
use super::types::ClaimKind;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "claim", rename_all = "snake_case")]
pub enum ClaimChoice {
    Hu,
    Kong,
    Pong,
    /// The full run, including the contested tile.
    Chi { tiles: Vec<Tile> },
    Pass,
}

impl ClaimChoice {
    pub fn kind(&self) -> Option<ClaimKind> {
        match self {
            ClaimChoice::Hu => Some(ClaimKind::Hu),
            ClaimChoice::Kong => Some(ClaimKind::Kong),
            ClaimChoice::Pong => Some(ClaimKind::Pong),
            ClaimChoice::Chi { .. } => Some(ClaimKind::Chi),
            ClaimChoice::Pass => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerAction {
    Draw,
    Discard {
        tile: Tile,
    },
    /// Answers an open claim window, or declares a self-drawn win when no
    /// window is open. `window` pins the decision to one window.
    Claim {
        choice: ClaimChoice,
        window: Option<u64>,
    },
    SelfKong {
        tile: Tile,
    },
    Ting {
        declare: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::serde::assert_round_trip_eq;
    use crate::test_utils::tiles;

    #[test]
    fn player_action_round_trips_with_serde() {
        assert_round_trip_eq(&PlayerAction::Claim {
            choice: ClaimChoice::Chi {
                tiles: tiles("三萬 四萬 五萬"),
            },
            window: Some(9),
        });
        assert_round_trip_eq(&PlayerAction::Ting { declare: true });
    }

    #[test]
    fn pass_has_no_claim_kind() {
        assert_eq!(ClaimChoice::Pass.kind(), None);
        assert_eq!(ClaimChoice::Pong.kind(), Some(ClaimKind::Pong));
    }
}
