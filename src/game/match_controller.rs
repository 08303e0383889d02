//! Round sequencing for one table: dealer rotation, round wind, running
//! scores and the append-only round history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RoomSettings;
use crate::engine::tw::{
    ActionError, HandState, MahjongEngine, PlayerAction, Points, RoundOutcome, RoundSetup, SeatId,
    TableEngine, TableEvent, TimerKind, TimerRequest, Transition, Wall, Wind, NUM_SEATS,
};

const LOG_TARGET: &str = "tw_mahjong::game::match";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub round: u32,
    pub dealer: SeatId,
    pub round_wind: Wind,
    pub winner: Option<SeatId>,
    pub discarder: Option<SeatId>,
    pub deltas: [Points; NUM_SEATS],
    pub finished_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    pub record: RoundRecord,
    pub scores: [Points; NUM_SEATS],
    pub is_last_round: bool,
}

/// What a single engine step did to the match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub events: Vec<TableEvent>,
    /// Set when this step ended a round.
    pub round_end: Option<RoundSummary>,
    /// Set when this step dealt a new round.
    pub round_started: bool,
}

impl Progress {
    fn from_transition(transition: Transition) -> (Self, Option<RoundOutcome>) {
        let outcome = transition.outcome().cloned();
        (
            Self {
                events: transition.into_events(),
                ..Self::default()
            },
            outcome,
        )
    }
}

/// Match-scoped state. Hand-scoped state lives in the current `HandState`
/// and is replaced on every deal.
#[derive(Clone, Debug)]
pub struct MatchController {
    settings: RoomSettings,
    auto_draw: bool,
    rng_seed: Option<u64>,
    scores: [Points; NUM_SEATS],
    round: u32,
    dealer: SeatId,
    /// Times the deal has moved on to the next seat.
    dealer_passes: u32,
    history: Vec<RoundRecord>,
    hand: Option<HandState>,
    next_token: u64,
    next_round_token: Option<u64>,
    finished: bool,
}

impl MatchController {
    pub fn new(settings: RoomSettings, auto_draw: bool, rng_seed: Option<u64>) -> Self {
        Self {
            settings,
            auto_draw,
            rng_seed,
            scores: [0; NUM_SEATS],
            round: 0,
            dealer: 0,
            dealer_passes: 0,
            history: Vec::new(),
            hand: None,
            next_token: 0,
            next_round_token: None,
            finished: false,
        }
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    pub fn scores(&self) -> [Points; NUM_SEATS] {
        self.scores
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn max_rounds(&self) -> u32 {
        self.settings.rounds
    }

    pub fn dealer(&self) -> SeatId {
        self.dealer
    }

    pub fn round_wind(&self) -> Wind {
        Wind::from_index(((self.dealer_passes / NUM_SEATS as u32) % 4) as usize)
    }

    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    pub fn hand(&self) -> Option<&HandState> {
        self.hand.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.round > 0
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Between rounds with a restart pending.
    pub fn awaiting_next_round(&self) -> bool {
        self.next_round_token.is_some()
    }

    /// Deal the next round. `settings` is the room configuration as read from
    /// storage right now.
    pub fn start_round(&mut self, settings: RoomSettings) -> Progress {
        self.settings = settings;
        self.next_round_token = None;
        self.round += 1;
        let setup = RoundSetup {
            round: self.round,
            dealer: self.dealer,
            round_wind: self.round_wind(),
            wall: Wall::shuffled(self.rng_seed, self.round),
            token_base: self.next_token,
        };
        info!(
            target: LOG_TARGET,
            round = self.round,
            dealer = self.dealer,
            wind = ?setup.round_wind,
            "dealing round"
        );
        let (hand, events) = TableEngine::deal(self.settings.hand_config(self.auto_draw), setup);
        let outcome = hand.outcome.clone().filter(|_| hand.is_over());
        self.hand = Some(hand);
        let mut progress = Progress {
            events,
            round_started: true,
            ..Progress::default()
        };
        // A wall can run dry during flower replacement in principle.
        if let Some(outcome) = outcome {
            progress.round_end = Some(self.finish_round(&outcome));
        }
        progress
    }

    pub fn apply_action(
        &mut self,
        seat: SeatId,
        action: PlayerAction,
    ) -> Result<Progress, ActionError> {
        let hand = self.hand.as_mut().ok_or(ActionError::WrongPhase)?;
        if self.next_round_token.is_some() || self.finished {
            return Err(ActionError::RoundOver);
        }
        let transition = TableEngine::apply_action(hand, seat, action)?;
        Ok(self.absorb(transition))
    }

    /// `NextRound` timers are not handled here; the caller re-reads the room
    /// settings and calls `start_round`.
    pub fn on_timeout(&mut self, timer: TimerRequest) -> Progress {
        if timer.kind == TimerKind::NextRound {
            return Progress::default();
        }
        let Some(hand) = self.hand.as_mut() else {
            return Progress::default();
        };
        let transition = TableEngine::on_timeout(hand, timer);
        self.absorb(transition)
    }

    pub fn disconnect(&mut self, seat: SeatId) -> Progress {
        let Some(hand) = self.hand.as_mut() else {
            return Progress::default();
        };
        let transition = TableEngine::disconnect(hand, seat);
        self.absorb(transition)
    }

    /// Whether a `NextRound` firing with this token should deal.
    pub fn next_round_due(&self, token: u64) -> bool {
        !self.finished && self.next_round_token == Some(token)
    }

    /// Timers wanted right now, the hand's or the pause between rounds.
    pub fn active_timers(&self) -> Vec<TimerRequest> {
        if self.finished {
            return Vec::new();
        }
        if let Some(token) = self.next_round_token {
            return vec![TimerRequest {
                kind: TimerKind::NextRound,
                token,
            }];
        }
        self.hand
            .as_ref()
            .map(HandState::active_timers)
            .unwrap_or_default()
    }

    /// Swap in a fixture hand. Tokens continue from the current hand so
    /// stale timers stay stale.
    #[cfg(test)]
    pub(crate) fn rig_hand(&mut self, mut hand: HandState) {
        hand.round = self.round;
        hand.next_token = self.hand.as_ref().map_or(self.next_token, |h| h.next_token);
        hand.turn_token = hand.fresh_token();
        self.hand = Some(hand);
    }

    fn absorb(&mut self, transition: Transition) -> Progress {
        let (mut progress, outcome) = Progress::from_transition(transition);
        if let Some(outcome) = outcome {
            progress.round_end = Some(self.finish_round(&outcome));
        }
        progress
    }

    fn finish_round(&mut self, outcome: &RoundOutcome) -> RoundSummary {
        let deltas = outcome.deltas();
        for (score, delta) in self.scores.iter_mut().zip(deltas) {
            *score += delta;
        }
        let (winner, discarder) = match outcome {
            RoundOutcome::Win {
                winner, discarder, ..
            } => (Some(*winner), *discarder),
            RoundOutcome::Draw => (None, None),
        };
        let record = RoundRecord {
            round: self.round,
            dealer: self.dealer,
            round_wind: self.round_wind(),
            winner,
            discarder,
            deltas,
            finished_at: Utc::now(),
        };
        self.history.push(record.clone());

        let dealer_keeps = winner.is_none() || winner == Some(self.dealer);
        if !dealer_keeps {
            self.dealer = (self.dealer + 1) % NUM_SEATS as SeatId;
            self.dealer_passes += 1;
        }

        if let Some(hand) = &self.hand {
            self.next_token = hand.next_token;
        }
        let is_last_round = self.round >= self.settings.rounds;
        if is_last_round {
            self.finished = true;
        } else {
            self.next_token += 1;
            self.next_round_token = Some(self.next_token);
        }
        info!(
            target: LOG_TARGET,
            round = self.round,
            ?winner,
            is_last_round,
            scores = ?self.scores,
            "round finished"
        );
        RoundSummary {
            record,
            scores: self.scores,
            is_last_round,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tw::{ClaimChoice, HandConfig};
    use crate::test_utils::{tile, tiles};

    const READY: &str = "一萬 二萬 三萬 四萬 五萬 六萬 七萬 八萬 九萬 一筒 一筒 一筒 東 東 中 中";

    fn controller(rounds: u32) -> MatchController {
        let settings = RoomSettings {
            rounds,
            ..RoomSettings::default()
        };
        MatchController::new(settings, false, Some(7))
    }

    /// Swap in a fixture hand where `winner` can win on `tile` discarded by
    /// the seat on turn.
    fn rig(ctl: &mut MatchController, on_turn: SeatId, winner: SeatId) {
        let mut hands: [Vec<_>; NUM_SEATS] = Default::default();
        hands[on_turn as usize] = tiles("九條 中");
        hands[winner as usize] = tiles(READY);
        let mut hand = HandState::in_play(
            HandConfig::default(),
            ctl.dealer,
            hands,
            Wall::from_tiles(tiles("北 北")),
        );
        hand.turn = on_turn;
        ctl.rig_hand(hand);
    }

    fn play_win(ctl: &mut MatchController, on_turn: SeatId, winner: SeatId) -> RoundSummary {
        rig(ctl, on_turn, winner);
        ctl.apply_action(on_turn, PlayerAction::Discard { tile: tile("中") })
            .unwrap();
        ctl.apply_action(
            winner,
            PlayerAction::Claim {
                choice: ClaimChoice::Hu,
                window: None,
            },
        )
        .unwrap()
        .round_end
        .expect("round ended")
    }

    #[test]
    fn dealer_stays_on_a_dealer_win_and_passes_otherwise() {
        let mut ctl = controller(4);
        ctl.start_round(RoomSettings { rounds: 4, ..RoomSettings::default() });
        let summary = play_win(&mut ctl, 1, 0);
        assert_eq!(summary.record.winner, Some(0));
        assert_eq!(ctl.dealer(), 0);
        assert!(ctl.awaiting_next_round());

        ctl.start_round(ctl.settings().clone());
        let summary = play_win(&mut ctl, 0, 2);
        assert_eq!(summary.record.dealer, 0);
        assert_eq!(ctl.dealer(), 1);
        assert_eq!(ctl.history().len(), 2);
        assert_eq!(ctl.scores().iter().sum::<Points>(), 0);
    }

    #[test]
    fn round_wind_advances_after_a_full_dealer_circuit() {
        let mut ctl = controller(16);
        assert_eq!(ctl.round_wind(), Wind::East);
        for expected_dealer in 1..=4u8 {
            ctl.start_round(ctl.settings().clone());
            let dealer = ctl.dealer();
            play_win(&mut ctl, dealer, (dealer + 1) % 4);
            assert_eq!(ctl.dealer(), expected_dealer % 4);
        }
        assert_eq!(ctl.round_wind(), Wind::South);
    }

    #[test]
    fn last_round_finishes_the_match_and_stops_timers() {
        let mut ctl = controller(1);
        let progress = ctl.start_round(ctl.settings().clone());
        assert!(progress.round_started);
        assert!(!ctl.active_timers().is_empty());
        let summary = play_win(&mut ctl, 1, 3);
        assert!(summary.is_last_round);
        assert!(ctl.is_finished());
        assert!(ctl.active_timers().is_empty());
        assert_eq!(
            ctl.apply_action(0, PlayerAction::Draw),
            Err(ActionError::RoundOver)
        );
    }

    #[test]
    fn next_round_timer_carries_a_fresh_token() {
        let mut ctl = controller(2);
        ctl.start_round(ctl.settings().clone());
        let last_hand_token = ctl.hand().map(|h| h.next_token).unwrap();
        play_win(&mut ctl, 1, 0);
        let timers = ctl.active_timers();
        assert_eq!(timers.len(), 1);
        assert_eq!(timers[0].kind, TimerKind::NextRound);
        assert!(timers[0].token > last_hand_token);
        assert!(ctl.next_round_due(timers[0].token));
        assert!(!ctl.next_round_due(timers[0].token + 1));
    }
}
