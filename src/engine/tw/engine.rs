use tracing::{debug, info, warn};

use super::actions::*;
use super::claims::{ClaimSource, ClaimingState};
use super::errors::*;
use super::events::*;
use super::hand::{Meld, MeldKind, SeatHand};
use super::legals::{self, LegalActions};
use super::scoring::{calculate_tai, settle, WinContext};
use super::seating::Seating;
use super::state::*;
use super::tiles::{Tile, NUM_FLOWERS};
use super::ting::{listen_kind, TingLock, TingState};
use super::types::*;
use super::validator::{self_kong_options, waiting_tiles, SelfKongKind};

const LOG_TARGET: &str = "tw_mahjong::engine";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Continued {
        events: Vec<TableEvent>,
    },
    RoundEnded {
        events: Vec<TableEvent>,
        outcome: RoundOutcome,
    },
}

impl Transition {
    fn from_state(state: &HandState, events: Vec<TableEvent>) -> Self {
        match &state.outcome {
            Some(outcome) if state.is_over() => Transition::RoundEnded {
                events,
                outcome: outcome.clone(),
            },
            _ => Transition::Continued { events },
        }
    }

    pub fn events(&self) -> &[TableEvent] {
        match self {
            Transition::Continued { events } | Transition::RoundEnded { events, .. } => events,
        }
    }

    pub fn into_events(self) -> Vec<TableEvent> {
        match self {
            Transition::Continued { events } | Transition::RoundEnded { events, .. } => events,
        }
    }

    pub fn outcome(&self) -> Option<&RoundOutcome> {
        match self {
            Transition::RoundEnded { outcome, .. } => Some(outcome),
            Transition::Continued { .. } => None,
        }
    }
}

pub trait MahjongEngine {
    fn deal(cfg: HandConfig, setup: RoundSetup) -> (HandState, Vec<TableEvent>);
    fn legal_actions(state: &HandState, seat: SeatId) -> LegalActions;
    fn apply_action(
        state: &mut HandState,
        seat: SeatId,
        action: PlayerAction,
    ) -> Result<Transition, ActionError>;
    /// Stale tokens are ignored and produce no events.
    fn on_timeout(state: &mut HandState, timer: TimerRequest) -> Transition;
    /// Drop the seat's pending decision and re-check whether the open window
    /// is complete.
    fn disconnect(state: &mut HandState, seat: SeatId) -> Transition;
}

pub struct TableEngine;

fn enter_phase(state: &mut HandState, phase: GamePhase) {
    if let Err(err) = state.set_phase(phase) {
        // Left as is; the invariant check reports the mismatch.
        warn!(target: LOG_TARGET, round = state.round, error = %err, "phase change refused");
    }
}

fn end_in_draw(state: &mut HandState, events: &mut Vec<TableEvent>) {
    state.claiming = None;
    state.ting = None;
    enter_phase(state, GamePhase::Ended);
    state.outcome = Some(RoundOutcome::Draw);
    events.push(TableEvent::RoundDrawn);
    info!(target: LOG_TARGET, round = state.round, "wall exhausted; round drawn");
}

fn note_eight_flowers(state: &mut HandState, seat: SeatId) {
    if state.seat(seat).flowers.len() == NUM_FLOWERS {
        state.flags[seat as usize].eight_flowers = true;
    }
}

/// Swap every flower in the seat's hand for tail draws. `false` when the wall
/// ran out and the round ended.
fn replace_flowers(state: &mut HandState, seat: SeatId, events: &mut Vec<TableEvent>) -> bool {
    loop {
        let flowers = state.seat_mut(seat).take_flowers();
        if flowers.is_empty() {
            break;
        }
        let needed = flowers.len();
        events.push(TableEvent::FlowerReplaced { seat, flowers });
        for _ in 0..needed {
            match state.wall.draw_back() {
                Some(tile) => state.seat_mut(seat).add(tile),
                None => {
                    end_in_draw(state, events);
                    return false;
                }
            }
        }
    }
    note_eight_flowers(state, seat);
    true
}

/// Draw until a non-flower arrives. Flowers drawn mid-game are set aside and
/// replaced from the tail.
fn draw_for(
    state: &mut HandState,
    seat: SeatId,
    mut from_tail: bool,
    events: &mut Vec<TableEvent>,
) -> bool {
    let tile = loop {
        let Some(tile) = state.wall.draw(from_tail) else {
            end_in_draw(state, events);
            return false;
        };
        if !tile.is_flower() {
            break tile;
        }
        state.seat_mut(seat).flowers.push(tile);
        events.push(TableEvent::FlowerReplaced {
            seat,
            flowers: vec![tile],
        });
        from_tail = true;
    };
    note_eight_flowers(state, seat);
    let hand = state.seat_mut(seat);
    hand.add(tile);
    hand.last_drawn = Some(tile);
    state.flags[seat as usize].has_drawn_once = true;
    state.step = TurnStep::AwaitingDiscard;
    state.turn_token = state.fresh_token();
    events.push(TableEvent::TileDrawn {
        seat,
        tile,
        from_tail,
    });
    debug!(target: LOG_TARGET, seat, %tile, from_tail, wall = state.wall.len(), "tile drawn");

    let auto = state.locks[seat as usize]
        .as_ref()
        .is_some_and(|lock| lock.kind.auto_discards());
    if auto && !legals::self_hu_allowed(state, seat) {
        discard_tile(state, seat, tile, true, events);
    }
    true
}

fn begin_turn(state: &mut HandState, seat: SeatId, events: &mut Vec<TableEvent>) {
    state.turn = seat;
    state.step = TurnStep::AwaitingDraw;
    let flags = &mut state.flags[seat as usize];
    flags.turn_has_discarded = false;
    flags.after_kong = false;
    state.turn_token = state.fresh_token();
    events.push(TableEvent::TurnStarted {
        seat,
        step: TurnStep::AwaitingDraw,
    });
    let auto_listener = state.locks[seat as usize]
        .as_ref()
        .is_some_and(|lock| lock.kind.auto_discards());
    if state.cfg.auto_draw || auto_listener {
        draw_for(state, seat, false, events);
    }
}

/// Hand the turn to a claimer who now owes a discard.
fn take_turn_to_discard(state: &mut HandState, seat: SeatId, events: &mut Vec<TableEvent>) {
    state.turn = seat;
    state.step = TurnStep::AwaitingDiscard;
    let flags = &mut state.flags[seat as usize];
    flags.turn_has_discarded = false;
    flags.after_kong = false;
    state.seat_mut(seat).last_drawn = None;
    state.turn_token = state.fresh_token();
    events.push(TableEvent::TurnStarted {
        seat,
        step: TurnStep::AwaitingDiscard,
    });
}

fn discard_tile(
    state: &mut HandState,
    seat: SeatId,
    tile: Tile,
    auto: bool,
    events: &mut Vec<TableEvent>,
) {
    let hand = state.seat_mut(seat);
    hand.remove(tile);
    hand.discards.push(tile);
    hand.last_drawn = None;
    let flags = &mut state.flags[seat as usize];
    let first_own = !flags.has_discarded_once;
    flags.turn_has_discarded = true;
    flags.has_discarded_once = true;
    flags.after_kong = false;
    state.discard_count += 1;
    events.push(TableEvent::Discarded { seat, tile, auto });
    debug!(target: LOG_TARGET, seat, %tile, auto, "discarded");

    let idx = seat as usize;
    let broken = state.locks[idx]
        .as_ref()
        .is_some_and(|lock| !lock.holds_for(&state.seats[idx]));
    if broken {
        state.locks[idx] = None;
        events.push(TableEvent::TingRevoked { seat });
        debug!(target: LOG_TARGET, seat, "listen revoked by discard");
    }

    if state.locks[idx].is_none() {
        let hand = state.seat(seat);
        let waits = waiting_tiles(&hand.hidden, hand.meld_count());
        if !waits.is_empty() {
            let kind = listen_kind(
                state.is_dealer(seat),
                first_own,
                state.discard_count,
                state.claims_made,
            );
            let window = state.fresh_token();
            events.push(TableEvent::TingWindowOpened {
                seat,
                window,
                kind,
                waits: waits.clone(),
            });
            state.ting = Some(TingState {
                window,
                seat,
                kind,
                discard: tile,
                waits,
            });
            debug!(target: LOG_TARGET, seat, window, ?kind, "ting window opened");
            return;
        }
    }
    open_claims(state, ClaimSource::Discard, seat, tile, events);
}

fn open_claims(
    state: &mut HandState,
    source: ClaimSource,
    from: SeatId,
    tile: Tile,
    events: &mut Vec<TableEvent>,
) {
    let window = state.fresh_token();
    match ClaimingState::open(window, source, from, tile, &state.seats, state.listening()) {
        Some(claiming) => {
            events.push(TableEvent::ClaimWindowOpened {
                window,
                source,
                from,
                tile,
                options: claiming.options.clone(),
            });
            debug!(
                target: LOG_TARGET,
                window,
                from,
                %tile,
                eligible = claiming.options.len(),
                "claim window opened"
            );
            state.claiming = Some(claiming);
            enter_phase(state, GamePhase::Claiming);
        }
        None => after_claims_passed(state, source, from, events),
    }
}

fn after_claims_passed(
    state: &mut HandState,
    source: ClaimSource,
    from: SeatId,
    events: &mut Vec<TableEvent>,
) {
    match source {
        ClaimSource::Discard => {
            let next = state.next_to_act(from);
            begin_turn(state, next, events);
        }
        ClaimSource::AddedKong => {
            state.flags[from as usize].after_kong = true;
            draw_for(state, from, true, events);
        }
    }
}

fn resolve_claims(state: &mut HandState, events: &mut Vec<TableEvent>) {
    let Some(claiming) = state.claiming.take() else {
        return;
    };
    enter_phase(state, GamePhase::Playing);
    match claiming.winner() {
        Some((seat, choice)) => execute_claim(state, &claiming, seat, choice, events),
        None => {
            debug!(target: LOG_TARGET, window = claiming.window, "claim window closed without claims");
            after_claims_passed(state, claiming.source, claiming.from, events);
        }
    }
}

fn execute_claim(
    state: &mut HandState,
    claiming: &ClaimingState,
    seat: SeatId,
    choice: ClaimChoice,
    events: &mut Vec<TableEvent>,
) {
    let tile = claiming.tile;
    let from = claiming.from;
    let Some(kind) = choice.kind() else {
        after_claims_passed(state, claiming.source, from, events);
        return;
    };

    if kind == ClaimKind::Hu {
        let robbed = claiming.source == ClaimSource::AddedKong;
        if robbed {
            let kong = state
                .seat_mut(from)
                .melds
                .iter_mut()
                .find(|m| m.kind == MeldKind::AddedKong && m.face() == Some(tile));
            if let Some(meld) = kong {
                meld.kind = MeldKind::Pong;
                meld.tiles.pop();
            }
            events.push(TableEvent::KongReverted { seat: from, tile });
        } else {
            state.seat_mut(from).discards.pop();
        }
        events.push(TableEvent::ClaimExecuted {
            seat,
            kind,
            from,
            tile,
            meld: None,
        });
        declare_win(state, seat, Some(from), Some(tile), robbed, events);
        return;
    }

    let (meld_kind, from_hand) = match &choice {
        ClaimChoice::Kong => (MeldKind::ExposedKong, vec![tile; 3]),
        ClaimChoice::Pong => (MeldKind::Pong, vec![tile; 2]),
        ClaimChoice::Chi { tiles } => {
            let mut rest = tiles.clone();
            if let Some(pos) = rest.iter().position(|&t| t == tile) {
                rest.remove(pos);
            }
            (MeldKind::Chi, rest)
        }
        ClaimChoice::Hu | ClaimChoice::Pass => return,
    };
    if !state.seat_mut(seat).remove_all(&from_hand) {
        warn!(target: LOG_TARGET, seat, ?kind, "claimed tiles left the hand; treating as pass");
        after_claims_passed(state, claiming.source, from, events);
        return;
    }
    state.seat_mut(from).discards.pop();
    let mut meld_tiles = from_hand;
    meld_tiles.push(tile);
    let meld = Meld::new(meld_kind, meld_tiles, from);
    state.seat_mut(seat).melds.push(meld.clone());
    state.claims_made += 1;
    events.push(TableEvent::ClaimExecuted {
        seat,
        kind,
        from,
        tile,
        meld: Some(meld),
    });
    debug!(target: LOG_TARGET, seat, from, ?kind, %tile, "claim executed");

    if kind == ClaimKind::Kong {
        state.turn = seat;
        let flags = &mut state.flags[seat as usize];
        flags.turn_has_discarded = false;
        flags.after_kong = true;
        events.push(TableEvent::TurnStarted {
            seat,
            step: TurnStep::AwaitingDraw,
        });
        draw_for(state, seat, true, events);
    } else {
        take_turn_to_discard(state, seat, events);
    }
}

fn declare_win(
    state: &mut HandState,
    winner: SeatId,
    discarder: Option<SeatId>,
    win_tile: Option<Tile>,
    robbed_kong: bool,
    events: &mut Vec<TableEvent>,
) {
    let self_drawn = discarder.is_none();
    let sheet = {
        let hand: &SeatHand = state.seat(winner);
        let mut hidden = hand.hidden.clone();
        if self_drawn {
            if let Some(pos) = win_tile.and_then(|w| hidden.iter().position(|&t| t == w)) {
                hidden.remove(pos);
            }
        }
        let flags = state.flags[winner as usize];
        let is_dealer = state.is_dealer(winner);
        let clean = state.claims_made == 0;
        let ctx = WinContext {
            hidden: &hidden,
            win_tile,
            melds: &hand.melds,
            flowers: &hand.flowers,
            seat_wind: state.seat_wind(winner),
            round_wind: state.round_wind,
            is_dealer,
            self_drawn,
            last_tile: state.wall.is_empty(),
            robbed_kong,
            after_kong: self_drawn && flags.after_kong,
            listen: state.locks[winner as usize].as_ref().map(|l| l.kind),
            heavenly_win: self_drawn && is_dealer && clean && state.discard_count == 0,
            earthly_win: self_drawn && !is_dealer && clean && !flags.has_discarded_once,
        };
        calculate_tai(&ctx, state.cfg.point_cap)
    };
    let settlement = settle(
        winner,
        discarder,
        sheet.total,
        state.cfg.base_points,
        state.cfg.scoring_unit,
    );
    if !self_drawn {
        if let Some(tile) = win_tile {
            state.seat_mut(winner).add(tile);
        }
    }
    state.claiming = None;
    state.ting = None;
    enter_phase(state, GamePhase::Ended);
    info!(
        target: LOG_TARGET,
        round = state.round,
        winner,
        ?discarder,
        tai = sheet.total,
        amount = settlement.amount,
        "hu declared"
    );
    events.push(TableEvent::HuDeclared {
        seat: winner,
        discarder,
        win_tile,
        hand: state.seat(winner).hidden.clone(),
        sheet: sheet.clone(),
        settlement: settlement.clone(),
    });
    state.outcome = Some(RoundOutcome::Win {
        winner,
        discarder,
        sheet,
        settlement,
    });
}

/// Turn-scoped checks shared by draw, discard and self kong.
fn guard_turn(state: &HandState, seat: SeatId) -> Result<(), ActionError> {
    if state.turn == seat && state.flags[seat as usize].turn_has_discarded {
        return Err(ActionError::AlreadyDiscarded);
    }
    if state.ting.is_some() || state.claiming.is_some() || state.phase != GamePhase::Playing {
        return Err(ActionError::WrongPhase);
    }
    if state.turn != seat {
        return Err(ActionError::NotYourTurn);
    }
    Ok(())
}

fn claim(
    state: &mut HandState,
    seat: SeatId,
    choice: ClaimChoice,
    window: Option<u64>,
    events: &mut Vec<TableEvent>,
) -> Result<(), ActionError> {
    if let Some(claiming) = state.claiming.as_mut() {
        if window.is_some_and(|w| w != claiming.window) {
            return Err(ActionError::ClaimAlreadyResolved);
        }
        claiming.decide(seat, choice)?;
        debug!(target: LOG_TARGET, seat, window = claiming.window, "claim decision recorded");
        if claiming.is_complete() {
            resolve_claims(state, events);
        }
        return Ok(());
    }

    let own_turn = state.ting.is_none()
        && state.phase == GamePhase::Playing
        && state.turn == seat
        && state.step == TurnStep::AwaitingDiscard
        && !state.flags[seat as usize].turn_has_discarded;
    if choice == ClaimChoice::Hu && own_turn {
        if !legals::self_hu_allowed(state, seat) {
            return Err(ActionError::ValidationFailed);
        }
        let win_tile = state.seat(seat).last_drawn;
        declare_win(state, seat, None, win_tile, false, events);
        return Ok(());
    }
    if window.is_some() {
        Err(ActionError::ClaimAlreadyResolved)
    } else {
        Err(ActionError::NotClaiming)
    }
}

fn self_kong(
    state: &mut HandState,
    seat: SeatId,
    tile: Tile,
    events: &mut Vec<TableEvent>,
) -> Result<(), ActionError> {
    guard_turn(state, seat)?;
    if state.step == TurnStep::AwaitingDraw {
        return Err(ActionError::MustDrawFirst);
    }
    let option = self_kong_options(state.seat(seat))
        .into_iter()
        .find(|o| o.tile == tile)
        .ok_or(ActionError::InvalidKong)?;
    let hand = state.seat_mut(seat);
    match option.kind {
        SelfKongKind::Concealed => {
            if !hand.remove_all(&[tile; 4]) {
                return Err(ActionError::InvalidKong);
            }
            hand.last_drawn = None;
            hand.melds
                .push(Meld::new(MeldKind::ConcealedKong, vec![tile; 4], seat));
            events.push(TableEvent::KongDeclared {
                seat,
                kind: option.kind,
                tile,
            });
            debug!(target: LOG_TARGET, seat, %tile, "concealed kong");
            state.flags[seat as usize].after_kong = true;
            draw_for(state, seat, true, events);
        }
        SelfKongKind::Added => {
            let Some(idx) = hand.pong_of(tile) else {
                return Err(ActionError::InvalidKong);
            };
            if !hand.remove(tile) {
                return Err(ActionError::InvalidKong);
            }
            hand.last_drawn = None;
            let meld = &mut hand.melds[idx];
            meld.kind = MeldKind::AddedKong;
            meld.tiles.push(tile);
            events.push(TableEvent::KongDeclared {
                seat,
                kind: option.kind,
                tile,
            });
            debug!(target: LOG_TARGET, seat, %tile, "added kong; checking for robbers");
            open_claims(state, ClaimSource::AddedKong, seat, tile, events);
        }
    }
    Ok(())
}

fn close_ting(state: &mut HandState, declare: bool, events: &mut Vec<TableEvent>) {
    let Some(ting) = state.ting.take() else {
        return;
    };
    if declare {
        let lock = TingLock::capture(state.seat(ting.seat), ting.kind);
        state.locks[ting.seat as usize] = Some(lock);
        events.push(TableEvent::TingDeclared {
            seat: ting.seat,
            kind: ting.kind,
        });
        debug!(target: LOG_TARGET, seat = ting.seat, kind = ?ting.kind, "ting declared");
    }
    open_claims(state, ClaimSource::Discard, ting.seat, ting.discard, events);
}

/// Turn timer: draw if needed, then throw the drawn tile, or the right-most
/// hidden tile when the turn came from a claim.
fn auto_play(state: &mut HandState, events: &mut Vec<TableEvent>) {
    let seat = state.turn;
    if state.flags[seat as usize].turn_has_discarded {
        return;
    }
    if state.step == TurnStep::AwaitingDraw && !draw_for(state, seat, false, events) {
        return;
    }
    let still_holding = !state.is_over()
        && state.ting.is_none()
        && state.claiming.is_none()
        && state.turn == seat
        && state.step == TurnStep::AwaitingDiscard
        && !state.flags[seat as usize].turn_has_discarded;
    if !still_holding {
        return;
    }
    let hand = state.seat(seat);
    if let Some(tile) = hand.last_drawn.or_else(|| hand.hidden.last().copied()) {
        discard_tile(state, seat, tile, true, events);
    }
}

impl MahjongEngine for TableEngine {
    fn deal(cfg: HandConfig, setup: RoundSetup) -> (HandState, Vec<TableEvent>) {
        let mut state = HandState::new(cfg, setup);
        let mut events = vec![TableEvent::RoundStarted {
            round: state.round,
            dealer: state.dealer,
            round_wind: state.round_wind,
        }];
        enter_phase(&mut state, GamePhase::Dealing);
        let hands = state.wall.deal(state.dealer);
        for (seat, tiles) in hands.into_iter().enumerate() {
            events.push(TableEvent::HandDealt {
                seat: seat as SeatId,
                tiles: tiles.clone(),
            });
            state.seats[seat] = SeatHand::with_hidden(tiles);
        }

        enter_phase(&mut state, GamePhase::FlowerReplacement);
        for offset in 0..NUM_SEATS as u8 {
            let seat = (state.dealer + offset) % NUM_SEATS as u8;
            if !replace_flowers(&mut state, seat, &mut events) {
                return (state, events);
            }
        }

        enter_phase(&mut state, GamePhase::Playing);
        info!(
            target: LOG_TARGET,
            round = state.round,
            dealer = state.dealer,
            wall = state.wall.len(),
            "round dealt"
        );
        let dealer = state.dealer;
        begin_turn(&mut state, dealer, &mut events);
        (state, events)
    }

    fn legal_actions(state: &HandState, seat: SeatId) -> LegalActions {
        legals::legal_actions(state, seat)
    }

    fn apply_action(
        state: &mut HandState,
        seat: SeatId,
        action: PlayerAction,
    ) -> Result<Transition, ActionError> {
        if state.is_over() {
            return Err(ActionError::RoundOver);
        }
        if seat as usize >= NUM_SEATS {
            return Err(ActionError::NotYourTurn);
        }
        let mut events = Vec::new();
        match action {
            PlayerAction::Draw => {
                guard_turn(state, seat)?;
                if state.step == TurnStep::AwaitingDiscard {
                    return Err(ActionError::AlreadyDrawn);
                }
                draw_for(state, seat, false, &mut events);
            }
            PlayerAction::Discard { tile } => {
                guard_turn(state, seat)?;
                if state.step == TurnStep::AwaitingDraw {
                    return Err(ActionError::MustDrawFirst);
                }
                if !state.seat(seat).contains(tile) {
                    return Err(ActionError::TileNotInHand);
                }
                discard_tile(state, seat, tile, false, &mut events);
            }
            PlayerAction::Claim { choice, window } => {
                claim(state, seat, choice, window, &mut events)?;
            }
            PlayerAction::SelfKong { tile } => {
                self_kong(state, seat, tile, &mut events)?;
            }
            PlayerAction::Ting { declare } => {
                if state.ting.as_ref().map(|t| t.seat) != Some(seat) {
                    return Err(ActionError::NotTingWindow);
                }
                close_ting(state, declare, &mut events);
            }
        }
        Ok(Transition::from_state(state, events))
    }

    fn on_timeout(state: &mut HandState, timer: TimerRequest) -> Transition {
        let mut events = Vec::new();
        if state.is_over() {
            return Transition::Continued { events };
        }
        match timer.kind {
            TimerKind::Ting => {
                if state.ting.as_ref().map(|t| t.window) == Some(timer.token) {
                    debug!(target: LOG_TARGET, token = timer.token, "ting window timed out");
                    close_ting(state, false, &mut events);
                }
            }
            TimerKind::Claim => {
                if let Some(claiming) = state.claiming.as_mut() {
                    if claiming.window == timer.token {
                        debug!(target: LOG_TARGET, token = timer.token, "claim window timed out");
                        claiming.force_pass();
                        resolve_claims(state, &mut events);
                    }
                }
            }
            TimerKind::Turn => {
                let current = timer.token == state.turn_token
                    && state.ting.is_none()
                    && state.claiming.is_none()
                    && state.phase == GamePhase::Playing;
                if current {
                    debug!(target: LOG_TARGET, seat = state.turn, "turn timed out");
                    auto_play(state, &mut events);
                }
            }
            TimerKind::NextRound => {}
        }
        Transition::from_state(state, events)
    }

    fn disconnect(state: &mut HandState, seat: SeatId) -> Transition {
        let mut events = Vec::new();
        if state.is_over() {
            return Transition::Continued { events };
        }
        if let Some(claiming) = state.claiming.as_mut() {
            if claiming.withdraw(seat) && claiming.is_complete() {
                resolve_claims(state, &mut events);
            }
        }
        if state.ting.as_ref().map(|t| t.seat) == Some(seat) {
            close_ting(state, false, &mut events);
        }
        Transition::from_state(state, events)
    }
}
