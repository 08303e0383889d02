//! Claim arbitration for a contested tile.
//!
//! Decisions are buffered per eligible seat and nothing is applied until every
//! seat has answered (or been forced to pass). The winner is picked by claim
//! priority, then by turn-order distance from the discarder, so arrival order
//! never matters.

use serde::{Deserialize, Serialize};

use super::actions::ClaimChoice;
use super::errors::ActionError;
use super::hand::SeatHand;
use super::seating::distance;
use super::tiles::Tile;
use super::types::{ClaimKind, SeatId, NUM_SEATS};
use super::validator::{can_hu, can_kong, can_pong, chi_options};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimSource {
    Discard,
    /// Rob-the-kong window; only hu is offered.
    AddedKong,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Undecided,
    Claim { choice: ClaimChoice },
    Pass,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimOption {
    pub seat: SeatId,
    /// Highest priority first.
    pub kinds: Vec<ClaimKind>,
    pub chi_runs: Vec<[Tile; 3]>,
    pub decision: Decision,
}

impl ClaimOption {
    fn best_priority(&self) -> u8 {
        self.kinds.iter().map(|k| k.priority()).min().unwrap_or(u8::MAX)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimingState {
    pub window: u64,
    pub source: ClaimSource,
    pub from: SeatId,
    pub tile: Tile,
    pub options: Vec<ClaimOption>,
}

impl ClaimingState {
    /// Eligibility for every seat other than `from`. Listening seats may only
    /// claim a win. Returns `None` when nobody can claim.
    pub fn open(
        window: u64,
        source: ClaimSource,
        from: SeatId,
        tile: Tile,
        seats: &[SeatHand; NUM_SEATS],
        listening: [bool; NUM_SEATS],
    ) -> Option<Self> {
        let mut options = Vec::new();
        for offset in 1..NUM_SEATS as u8 {
            let seat = (from + offset) % NUM_SEATS as u8;
            let hand = &seats[seat as usize];
            let mut kinds = Vec::new();
            let mut chi_runs = Vec::new();
            if can_hu(&hand.hidden, Some(tile), hand.meld_count()) {
                kinds.push(ClaimKind::Hu);
            }
            if source == ClaimSource::Discard && !listening[seat as usize] {
                if can_kong(&hand.hidden, tile) {
                    kinds.push(ClaimKind::Kong);
                }
                if can_pong(&hand.hidden, tile) {
                    kinds.push(ClaimKind::Pong);
                }
                if offset == 1 {
                    chi_runs = chi_options(&hand.hidden, tile);
                    if !chi_runs.is_empty() {
                        kinds.push(ClaimKind::Chi);
                    }
                }
            }
            if !kinds.is_empty() {
                options.push(ClaimOption {
                    seat,
                    kinds,
                    chi_runs,
                    decision: Decision::Undecided,
                });
            }
        }
        if options.is_empty() {
            return None;
        }
        // Stable: equal priorities stay in turn order from the discarder.
        options.sort_by_key(ClaimOption::best_priority);
        Some(Self {
            window,
            source,
            from,
            tile,
            options,
        })
    }

    pub fn option(&self, seat: SeatId) -> Option<&ClaimOption> {
        self.options.iter().find(|o| o.seat == seat)
    }

    pub fn decide(&mut self, seat: SeatId, choice: ClaimChoice) -> Result<(), ActionError> {
        let option = self
            .options
            .iter_mut()
            .find(|o| o.seat == seat)
            .ok_or(ActionError::NotEligible)?;
        if option.decision != Decision::Undecided {
            return Err(ActionError::ClaimAlreadyResolved);
        }
        let choice = match choice {
            ClaimChoice::Pass => {
                option.decision = Decision::Pass;
                return Ok(());
            }
            ClaimChoice::Chi { mut tiles } => {
                tiles.sort();
                let offered = option.chi_runs.iter().any(|run| run.as_slice() == tiles);
                if !offered {
                    return Err(ActionError::ValidationFailed);
                }
                ClaimChoice::Chi { tiles }
            }
            other => other,
        };
        match choice.kind() {
            Some(kind) if option.kinds.contains(&kind) => {
                option.decision = Decision::Claim { choice };
                Ok(())
            }
            _ => Err(ActionError::ValidationFailed),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.options
            .iter()
            .all(|o| o.decision != Decision::Undecided)
    }

    pub fn force_pass(&mut self) {
        for option in &mut self.options {
            if option.decision == Decision::Undecided {
                option.decision = Decision::Pass;
            }
        }
    }

    /// Drop a seat's pending option. Decided options stay in place.
    pub fn withdraw(&mut self, seat: SeatId) -> bool {
        let before = self.options.len();
        self.options
            .retain(|o| !(o.seat == seat && o.decision == Decision::Undecided));
        self.options.len() != before
    }

    /// Highest-priority claim; ties go to the seat nearest the discarder.
    pub fn winner(&self) -> Option<(SeatId, ClaimChoice)> {
        self.options
            .iter()
            .filter_map(|o| match &o.decision {
                Decision::Claim { choice } => choice.kind().map(|kind| (o.seat, kind, choice)),
                _ => None,
            })
            .min_by_key(|(seat, kind, _)| (kind.priority(), distance(self.from, *seat)))
            .map(|(seat, _, choice)| (seat, choice.clone()))
    }
}
