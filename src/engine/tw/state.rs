use serde::{Deserialize, Serialize};

use super::claims::ClaimingState;
use super::errors::*;
use super::hand::SeatHand;
use super::scoring::{ScoreSheet, Settlement};
use super::tiles::{Tile, Wind, TOTAL_TILES};
use super::ting::{TingLock, TingState};
use super::types::*;
use super::wall::Wall;

/// Write-once-per-hand markers for one seat, cleared at round start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatFlags {
    pub turn_has_discarded: bool,
    /// The seat's last draw was a kong replacement.
    pub after_kong: bool,
    pub has_discarded_once: bool,
    pub has_drawn_once: bool,
    /// Holds all eight flowers and may declare a win on its own turn.
    pub eight_flowers: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RoundOutcome {
    Win {
        winner: SeatId,
        discarder: Option<SeatId>,
        sheet: ScoreSheet,
        settlement: Settlement,
    },
    Draw,
}

impl RoundOutcome {
    pub fn deltas(&self) -> [Points; NUM_SEATS] {
        match self {
            RoundOutcome::Win { settlement, .. } => settlement.deltas,
            RoundOutcome::Draw => [0; NUM_SEATS],
        }
    }

    pub fn winner(&self) -> Option<SeatId> {
        match self {
            RoundOutcome::Win { winner, .. } => Some(*winner),
            RoundOutcome::Draw => None,
        }
    }
}

/// Everything needed to start a round.
#[derive(Clone, Debug)]
pub struct RoundSetup {
    pub round: u32,
    pub dealer: SeatId,
    pub round_wind: Wind,
    pub wall: Wall,
    /// Timer tokens continue from here so stale firings from an earlier
    /// round can never match.
    pub token_base: u64,
}

/// Mutable state of one round at one table.
#[derive(Clone, Debug)]
pub struct HandState {
    pub cfg: HandConfig,
    pub round: u32,
    pub dealer: SeatId,
    pub round_wind: Wind,
    pub phase: GamePhase,
    pub turn: SeatId,
    pub step: TurnStep,
    pub wall: Wall,
    pub seats: [SeatHand; NUM_SEATS],
    pub flags: [SeatFlags; NUM_SEATS],
    pub claiming: Option<ClaimingState>,
    pub ting: Option<TingState>,
    pub locks: [Option<TingLock>; NUM_SEATS],
    pub claims_made: u32,
    pub discard_count: u32,
    pub turn_token: u64,
    pub next_token: u64,
    pub outcome: Option<RoundOutcome>,
}

impl HandState {
    pub fn new(cfg: HandConfig, setup: RoundSetup) -> Self {
        Self {
            cfg,
            round: setup.round,
            dealer: setup.dealer,
            round_wind: setup.round_wind,
            phase: GamePhase::Waiting,
            turn: setup.dealer,
            step: TurnStep::AwaitingDraw,
            wall: setup.wall,
            seats: Default::default(),
            flags: Default::default(),
            claiming: None,
            ting: None,
            locks: Default::default(),
            claims_made: 0,
            discard_count: 0,
            turn_token: setup.token_base,
            next_token: setup.token_base,
            outcome: None,
        }
    }

    /// A round already in play with the given hidden tiles; the dealer is on
    /// turn and about to discard. Meant for fixtures and replays.
    pub fn in_play(cfg: HandConfig, dealer: SeatId, hands: [Vec<Tile>; NUM_SEATS], wall: Wall) -> Self {
        let mut state = Self {
            phase: GamePhase::Playing,
            ..Self::new(
                cfg,
                RoundSetup {
                    round: 1,
                    dealer,
                    round_wind: Wind::East,
                    wall,
                    token_base: 0,
                },
            )
        };
        state.seats = hands.map(SeatHand::with_hidden);
        state.step = TurnStep::AwaitingDiscard;
        state.flags[dealer as usize].has_drawn_once = true;
        state.turn_token = state.fresh_token();
        state
    }

    pub fn seat(&self, seat: SeatId) -> &SeatHand {
        &self.seats[seat as usize]
    }

    pub fn seat_mut(&mut self, seat: SeatId) -> &mut SeatHand {
        &mut self.seats[seat as usize]
    }

    pub fn fresh_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    /// Move to `next` if the phase table allows it. Refused moves leave the
    /// phase untouched.
    pub fn set_phase(&mut self, next: GamePhase) -> Result<(), StateError> {
        if !self.phase.can_transition_to(next) {
            return Err(StateError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::Ended
    }

    pub fn hand_counts(&self) -> [usize; NUM_SEATS] {
        let mut counts = [0; NUM_SEATS];
        for (count, hand) in counts.iter_mut().zip(&self.seats) {
            *count = hand.hidden.len();
        }
        counts
    }

    pub fn listening(&self) -> [bool; NUM_SEATS] {
        let mut listening = [false; NUM_SEATS];
        for (flag, lock) in listening.iter_mut().zip(&self.locks) {
            *flag = lock.is_some();
        }
        listening
    }

    pub fn tiles_in_play(&self) -> usize {
        self.wall.len() + self.seats.iter().map(SeatHand::tile_total).sum::<usize>()
    }

    /// The timers this state wants armed right now. At most one per kind.
    pub fn active_timers(&self) -> Vec<TimerRequest> {
        if self.phase != GamePhase::Playing && self.phase != GamePhase::Claiming {
            return Vec::new();
        }
        if let Some(ting) = &self.ting {
            return vec![TimerRequest {
                kind: TimerKind::Ting,
                token: ting.window,
            }];
        }
        if let Some(claiming) = &self.claiming {
            return vec![TimerRequest {
                kind: TimerKind::Claim,
                token: claiming.window,
            }];
        }
        vec![TimerRequest {
            kind: TimerKind::Turn,
            token: self.turn_token,
        }]
    }
}

impl InvariantCheck for HandState {
    fn validate_invariants(&self) -> Result<(), StateError> {
        if self.tiles_in_play() != TOTAL_TILES {
            return Err(StateError::InvariantViolation("tile conservation"));
        }
        if self.claiming.is_some() && self.ting.is_some() {
            return Err(StateError::InvariantViolation("two decision windows open"));
        }
        if self.claiming.is_some() != (self.phase == GamePhase::Claiming) {
            return Err(StateError::InvariantViolation("claim window and phase disagree"));
        }
        if self.phase != GamePhase::Playing || self.ting.is_some() {
            return Ok(());
        }
        for (seat, hand) in self.seats.iter().enumerate() {
            let holding = seat == self.turn as usize
                && self.step == TurnStep::AwaitingDiscard
                && !self.flags[seat].turn_has_discarded;
            let expected = if holding { WINNING_SIZE } else { HAND_SIZE };
            if hand.hidden.len() + 3 * hand.meld_count() != expected {
                return Err(StateError::InvariantViolation("hand size"));
            }
            if hand.hidden.iter().any(|t| t.is_flower()) {
                return Err(StateError::InvariantViolation("flower left in hand"));
            }
        }
        Ok(())
    }
}
