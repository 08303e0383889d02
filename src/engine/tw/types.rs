use serde::{Deserialize, Serialize};

pub use crate::game::game_phases::GamePhase;
use crate::config::PointCap;

pub type SeatId = u8; // 0..=3
pub type PlayerId = u64;
pub type Points = i64;
pub type Tai = u32;

pub const NUM_SEATS: usize = 4;
pub const HAND_SIZE: usize = 16;
/// Tiles in a complete winning shape: five melds and a pair.
pub const WINNING_SIZE: usize = HAND_SIZE + 1;
pub const MELDS_TO_WIN: usize = 5;

/// Fixed for the hand; read from the room settings at round start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandConfig {
    pub base_points: Points,
    pub scoring_unit: Points,
    pub point_cap: PointCap,
    /// Draw for the seat as soon as its turn starts.
    pub auto_draw: bool,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            base_points: 100,
            scoring_unit: 20,
            point_cap: PointCap::Unlimited,
            auto_draw: false,
        }
    }
}

/// Where the seat on turn is inside its draw/discard cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStep {
    AwaitingDraw,
    AwaitingDiscard,
}

/// Claim types ordered by arbitration priority (lower wins).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Hu,
    Kong,
    Pong,
    Chi,
}

impl ClaimKind {
    pub fn priority(self) -> u8 {
        match self {
            ClaimKind::Hu => 1,
            ClaimKind::Kong => 2,
            ClaimKind::Pong => 3,
            ClaimKind::Chi => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenKind {
    Declared,
    Earthly,
    Heavenly,
}

impl ListenKind {
    /// Heavenly and earthly listeners discard drawn tiles without input.
    pub fn auto_discards(self) -> bool {
        matches!(self, ListenKind::Heavenly | ListenKind::Earthly)
    }
}

/// Decision windows guarded by a timer. A table holds at most one live timer per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    Turn,
    Claim,
    Ting,
    NextRound,
}

/// A timer the state currently wants armed. `token` changes whenever the
/// guarded window is replaced, so a firing with an old token is stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerRequest {
    pub kind: TimerKind,
    pub token: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::serde::assert_round_trip_eq;

    #[test]
    fn claim_priority_follows_declaration_order() {
        let mut kinds = vec![ClaimKind::Chi, ClaimKind::Hu, ClaimKind::Pong, ClaimKind::Kong];
        kinds.sort_by_key(|k| k.priority());
        assert_eq!(
            kinds,
            vec![ClaimKind::Hu, ClaimKind::Kong, ClaimKind::Pong, ClaimKind::Chi]
        );
    }

    #[test]
    fn enums_round_trip_with_serde() {
        assert_round_trip_eq(&TurnStep::AwaitingDiscard);
        assert_round_trip_eq(&ListenKind::Heavenly);
        assert_round_trip_eq(&TimerRequest {
            kind: TimerKind::Claim,
            token: 7,
        });
    }
}
