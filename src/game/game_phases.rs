//! Table phase definitions and transitions

use serde::{Deserialize, Serialize};

/// Phases a table moves through during one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    /// Seats are still filling
    Waiting,
    /// Wall shuffled, sixteen tiles going to each seat
    Dealing,
    /// Seats swap their flower tiles for wall tiles
    FlowerReplacement,
    /// Normal draw/discard cycle
    Playing,
    /// A discarded or kong tile is being contested
    Claiming,
    /// Round finished; the match controller restarts dealing or closes the match
    Ended,
}

impl GamePhase {
    /// Check if transition from current phase to target phase is valid.
    pub fn can_transition_to(&self, target: GamePhase) -> bool {
        use GamePhase::*;
        matches!(
            (self, target),
            (Waiting, Dealing)
                | (Dealing, FlowerReplacement)
                | (FlowerReplacement, Playing)
                | (FlowerReplacement, Ended)
                | (Playing, Claiming)
                | (Claiming, Playing)
                | (Playing, Ended)
                | (Claiming, Ended)
                | (Ended, Dealing)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::serde::assert_round_trip_eq;

    #[test]
    fn round_cycle_transitions_are_valid() {
        let cycle = [
            GamePhase::Waiting,
            GamePhase::Dealing,
            GamePhase::FlowerReplacement,
            GamePhase::Playing,
            GamePhase::Claiming,
            GamePhase::Playing,
            GamePhase::Ended,
            GamePhase::Dealing,
        ];
        for pair in cycle.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
        assert!(!GamePhase::Ended.can_transition_to(GamePhase::Playing));
        assert!(!GamePhase::Waiting.can_transition_to(GamePhase::Playing));
        assert!(!GamePhase::Claiming.can_transition_to(GamePhase::Claiming));
    }

    #[test]
    fn an_empty_wall_during_flower_replacement_ends_the_round() {
        assert!(GamePhase::FlowerReplacement.can_transition_to(GamePhase::Ended));
        assert!(!GamePhase::Dealing.can_transition_to(GamePhase::Ended));
    }

    #[test]
    fn phases_use_wire_names() {
        assert_eq!(
            serde_json::to_string(&GamePhase::FlowerReplacement).unwrap(),
            "\"FLOWER_REPLACEMENT\""
        );
        assert_round_trip_eq(&GamePhase::Claiming);
    }
}
