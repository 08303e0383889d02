use serde::{Deserialize, Serialize};

use super::claims::{ClaimOption, Decision};
use super::state::HandState;
use super::tiles::Tile;
use super::types::*;
use super::validator::{can_hu, self_kong_options, waiting_tiles, SelfKongOption};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalActions {
    pub may_draw: bool,
    pub may_discard: bool,
    pub may_self_hu: bool,
    pub self_kongs: Vec<SelfKongOption>,
    /// The seat's undecided option in the open claim window.
    pub claim: Option<ClaimOption>,
    /// Listen type on offer in the open ting window.
    pub ting: Option<ListenKind>,
    /// Faces that would complete the hand as it stands.
    pub waits: Vec<Tile>,
}

/// Would the seat on turn win with the tiles it holds now?
pub fn self_hu_allowed(state: &HandState, seat: SeatId) -> bool {
    let flags = &state.flags[seat as usize];
    if flags.eight_flowers {
        return true;
    }
    let hand = state.seat(seat);
    match hand.last_drawn {
        Some(drawn) => {
            let mut rest = hand.hidden.clone();
            if let Some(pos) = rest.iter().position(|&t| t == drawn) {
                rest.remove(pos);
            }
            can_hu(&rest, Some(drawn), hand.meld_count())
        }
        None => false,
    }
}

pub fn legal_actions(state: &HandState, seat: SeatId) -> LegalActions {
    let mut legals = LegalActions::default();
    if state.is_over() {
        return legals;
    }
    let hand = state.seat(seat);
    if hand.hidden.len() + 3 * hand.meld_count() == HAND_SIZE {
        legals.waits = waiting_tiles(&hand.hidden, hand.meld_count());
    }
    if let Some(ting) = &state.ting {
        if ting.seat == seat {
            legals.ting = Some(ting.kind);
        }
        return legals;
    }
    if let Some(claiming) = &state.claiming {
        legals.claim = claiming
            .option(seat)
            .filter(|o| o.decision == Decision::Undecided)
            .cloned();
        return legals;
    }
    if state.turn != seat || state.flags[seat as usize].turn_has_discarded {
        return legals;
    }
    match state.step {
        TurnStep::AwaitingDraw => legals.may_draw = true,
        TurnStep::AwaitingDiscard => {
            legals.may_discard = true;
            legals.may_self_hu = self_hu_allowed(state, seat);
            legals.self_kongs = self_kong_options(hand);
        }
    }
    legals
}
