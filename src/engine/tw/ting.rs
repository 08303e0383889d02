//! Listen ("ting") decisions.
//!
//! A window opens for the seat that just discarded when its remaining hand is
//! one tile from winning. Declaring stores a [`TingLock`]: the sorted hidden
//! tiles and meld count at that moment. Every later discard by the seat is
//! compared against the lock and a mismatch silently revokes it.

use serde::{Deserialize, Serialize};

use super::hand::SeatHand;
use super::tiles::Tile;
use super::types::{ListenKind, SeatId};

/// An open listen decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TingState {
    pub window: u64,
    pub seat: SeatId,
    /// The listen type the seat gets if it declares now.
    pub kind: ListenKind,
    /// The discard that opened the window; claims on it wait for the decision.
    pub discard: Tile,
    pub waits: Vec<Tile>,
}

/// The hand shape a listening seat committed to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TingLock {
    pub kind: ListenKind,
    hidden: Vec<Tile>,
    meld_count: usize,
}

impl TingLock {
    pub fn capture(hand: &SeatHand, kind: ListenKind) -> Self {
        Self {
            kind,
            hidden: hand.hidden.clone(),
            meld_count: hand.meld_count(),
        }
    }

    /// `hand.hidden` is kept sorted, so plain equality compares multisets.
    pub fn holds_for(&self, hand: &SeatHand) -> bool {
        self.meld_count == hand.meld_count() && self.hidden == hand.hidden
    }
}

/// Which listen type a seat reaches with its `discard_number`-th discard of
/// the round (counted over all seats).
pub fn listen_kind(
    is_dealer: bool,
    first_own_discard: bool,
    discard_number: u32,
    claims_made: u32,
) -> ListenKind {
    if claims_made == 0 && first_own_discard {
        if is_dealer && discard_number == 1 {
            return ListenKind::Heavenly;
        }
        if !is_dealer {
            return ListenKind::Earthly;
        }
    }
    ListenKind::Declared
}
