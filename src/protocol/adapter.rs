//! Idempotent intent → event boundary around one table's match.
//!
//! Each player's last `(clientSeq, reply)` pair is cached. A resubmitted
//! sequence number gets the cached reply back verbatim and nothing is
//! re-executed; an older one is rejected as stale. Every reply to the
//! requesting player ends with a `TABLE_SNAPSHOT` for that player. Events for
//! everybody else are queued in the outbox for the transport to fan out.

use std::collections::HashMap;

use tracing::{debug, info};

use super::events::ProtocolEvent;
use super::intents::IntentEnvelope;
use super::snapshot::{build_snapshot, SeatInfo, TableSnapshot};
use super::TableId;
use crate::config::{EngineConfig, RoomSettings};
use crate::engine::tw::{PlayerId, SeatId, TimerRequest, NUM_SEATS};
use crate::game::{MatchController, Progress};

const LOG_TARGET: &str = "tw_mahjong::protocol::adapter";

pub const STALE_SEQUENCE: &str = "STALE_SEQUENCE";
pub const NOT_SEATED: &str = "NOT_SEATED";
pub const TABLE_FULL: &str = "TABLE_FULL";
pub const MATCH_IN_PROGRESS: &str = "MATCH_IN_PROGRESS";

/// Events for one player, in order, ending with their snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub to: PlayerId,
    pub events: Vec<ProtocolEvent>,
}

#[derive(Clone, Debug)]
struct CachedReply {
    seq: u64,
    events: Vec<ProtocolEvent>,
}

pub struct ProtocolAdapter {
    table_id: TableId,
    seats: [Option<SeatInfo>; NUM_SEATS],
    controller: MatchController,
    replies: HashMap<PlayerId, CachedReply>,
    outbox: Vec<Delivery>,
}

impl ProtocolAdapter {
    pub fn new(table_id: TableId, settings: RoomSettings, cfg: &EngineConfig) -> Self {
        Self {
            table_id,
            seats: [None; NUM_SEATS],
            controller: MatchController::new(settings, cfg.auto_draw, cfg.rng_seed),
            replies: HashMap::new(),
            outbox: Vec::new(),
        }
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn controller(&self) -> &MatchController {
        &self.controller
    }

    pub fn seat_of(&self, player: PlayerId) -> Option<SeatId> {
        self.seats
            .iter()
            .position(|s| s.is_some_and(|info| info.player_id == player))
            .map(|idx| idx as SeatId)
    }

    /// Seated players in seat order.
    pub fn players(&self) -> Vec<PlayerId> {
        self.seats.iter().flatten().map(|s| s.player_id).collect()
    }

    /// No seated player is still connected.
    pub fn is_abandoned(&self) -> bool {
        self.seats.iter().flatten().all(|s| !s.connected)
    }

    pub fn ready_to_start(&self) -> bool {
        self.seats.iter().all(Option::is_some) && !self.controller.is_started()
    }

    pub fn is_finished(&self) -> bool {
        self.controller.is_finished()
    }

    pub fn next_round_due(&self, token: u64) -> bool {
        self.controller.next_round_due(token)
    }

    pub fn active_timers(&self) -> Vec<TimerRequest> {
        self.controller.active_timers()
    }

    pub fn take_outbox(&mut self) -> Vec<Delivery> {
        std::mem::take(&mut self.outbox)
    }

    pub fn snapshot(&self, viewer: Option<SeatId>) -> TableSnapshot {
        build_snapshot(self.table_id, &self.seats, &self.controller, viewer)
    }

    fn snapshot_event(&self, viewer: Option<SeatId>) -> ProtocolEvent {
        ProtocolEvent::TableSnapshot(Box::new(self.snapshot(viewer)))
    }

    /// Seat a player, or reconnect one who already holds a seat.
    pub fn join(&mut self, player: PlayerId) -> Vec<ProtocolEvent> {
        if let Some(seat) = self.seat_of(player) {
            if let Some(info) = self.seats[seat as usize].as_mut() {
                info.connected = true;
            }
            info!(target: LOG_TARGET, table = %self.table_id, player, seat, "player reconnected");
            let joined = ProtocolEvent::PlayerJoined {
                player_id: player,
                seat,
            };
            self.notify_others(Some(seat), joined.clone());
            return vec![joined, self.snapshot_event(Some(seat))];
        }
        if self.controller.is_started() {
            return vec![
                ProtocolEvent::rejected(MATCH_IN_PROGRESS, None),
                self.snapshot_event(None),
            ];
        }
        let Some(idx) = self.seats.iter().position(Option::is_none) else {
            return vec![
                ProtocolEvent::rejected(TABLE_FULL, None),
                self.snapshot_event(None),
            ];
        };
        let seat = idx as SeatId;
        self.seats[idx] = Some(SeatInfo {
            player_id: player,
            connected: true,
        });
        info!(target: LOG_TARGET, table = %self.table_id, player, seat, "player seated");
        let joined = ProtocolEvent::PlayerJoined {
            player_id: player,
            seat,
        };
        self.notify_others(Some(seat), joined.clone());
        vec![joined, self.snapshot_event(Some(seat))]
    }

    /// Before the match starts the seat is freed; afterwards it stays and is
    /// played by timers.
    pub fn leave(&mut self, player: PlayerId) -> Vec<ProtocolEvent> {
        let Some(seat) = self.seat_of(player) else {
            return vec![ProtocolEvent::rejected(NOT_SEATED, None)];
        };
        let kept_seat = self.controller.is_started();
        if kept_seat {
            self.mark_disconnected(seat);
        } else {
            self.seats[seat as usize] = None;
            self.replies.remove(&player);
        }
        info!(target: LOG_TARGET, table = %self.table_id, player, seat, kept_seat, "player left");
        let left = ProtocolEvent::PlayerLeft {
            player_id: player,
            seat,
            kept_seat,
        };
        self.notify_others(Some(seat), left.clone());
        vec![left]
    }

    /// Transport lost the player. Their pending decisions are withdrawn.
    pub fn disconnect(&mut self, player: PlayerId) {
        if let Some(seat) = self.seat_of(player) {
            debug!(target: LOG_TARGET, table = %self.table_id, player, seat, "player disconnected");
            self.mark_disconnected(seat);
        }
    }

    fn mark_disconnected(&mut self, seat: SeatId) {
        if let Some(info) = self.seats[seat as usize].as_mut() {
            info.connected = false;
        }
        let progress = self.controller.disconnect(seat);
        self.publish(progress, None);
    }

    /// Deal the next round with freshly loaded room settings.
    pub fn start_round(&mut self, settings: RoomSettings) {
        let progress = self.controller.start_round(settings);
        self.publish(progress, None);
    }

    pub fn on_timeout(&mut self, timer: TimerRequest) {
        let progress = self.controller.on_timeout(timer);
        if !progress.events.is_empty() || progress.round_end.is_some() {
            self.publish(progress, None);
        }
    }

    pub fn apply_intent(&mut self, player: PlayerId, envelope: IntentEnvelope) -> Vec<ProtocolEvent> {
        let seq = envelope.client_seq;
        let Some(seat) = self.seat_of(player) else {
            return vec![
                ProtocolEvent::rejected(NOT_SEATED, Some(seq)),
                self.snapshot_event(None),
            ];
        };
        if let Some(cached) = self.replies.get(&player) {
            if seq == cached.seq {
                debug!(target: LOG_TARGET, player, seq, "replaying cached reply");
                return cached.events.clone();
            }
            if seq < cached.seq {
                return vec![
                    ProtocolEvent::rejected(STALE_SEQUENCE, Some(seq)),
                    self.snapshot_event(Some(seat)),
                ];
            }
        }

        let reply = match self
            .controller
            .apply_action(seat, envelope.intent.into_action())
        {
            Ok(progress) => self.publish(progress, Some(seat)),
            Err(err) if err.is_silent() => {
                debug!(target: LOG_TARGET, player, seq, "intent failed validation; ignored");
                vec![self.snapshot_event(Some(seat))]
            }
            Err(err) => {
                debug!(target: LOG_TARGET, player, seq, code = err.code(), "intent rejected");
                vec![
                    ProtocolEvent::rejected(err.code(), Some(seq)),
                    self.snapshot_event(Some(seat)),
                ]
            }
        };
        self.replies.insert(
            player,
            CachedReply {
                seq,
                events: reply.clone(),
            },
        );
        reply
    }

    /// Fan a step out to every seat. Returns the requester's share and queues
    /// the rest for connected players.
    fn publish(&mut self, progress: Progress, requester: Option<SeatId>) -> Vec<ProtocolEvent> {
        let mut per_seat: [Vec<ProtocolEvent>; NUM_SEATS] = Default::default();
        if progress.round_started {
            let start = ProtocolEvent::RoundStart {
                round: self.controller.round(),
                max_rounds: self.controller.max_rounds(),
                dealer: self.controller.dealer(),
                round_wind: self.controller.round_wind(),
            };
            for events in per_seat.iter_mut() {
                events.push(start.clone());
            }
        }
        for event in &progress.events {
            for (idx, events) in per_seat.iter_mut().enumerate() {
                if let Some(projected) = ProtocolEvent::project(event, idx as SeatId) {
                    events.push(projected);
                }
            }
        }
        if progress.round_started {
            if let Some(hand) = self.controller.hand() {
                for (idx, events) in per_seat.iter_mut().enumerate() {
                    let held = hand.seat(idx as SeatId);
                    events.push(ProtocolEvent::HandSync {
                        seat: idx as SeatId,
                        hand: held.hidden.clone(),
                        flowers: held.flowers.clone(),
                    });
                }
            }
        }
        if let Some(summary) = &progress.round_end {
            let end = ProtocolEvent::RoundEnd {
                round: summary.record.round,
                winner: summary.record.winner,
                deltas: summary.record.deltas,
                scores: summary.scores,
                is_last_round: summary.is_last_round,
            };
            let game_end = summary.is_last_round.then(|| ProtocolEvent::GameEnd {
                final_scores: summary.scores,
                history: self.controller.history().to_vec(),
            });
            for events in per_seat.iter_mut() {
                events.push(end.clone());
                events.extend(game_end.clone());
            }
        }

        let mut reply = Vec::new();
        for (idx, mut events) in per_seat.into_iter().enumerate() {
            let seat = idx as SeatId;
            if Some(seat) == requester {
                events.push(self.snapshot_event(Some(seat)));
                reply = events;
                continue;
            }
            let Some(info) = self.seats[idx] else {
                continue;
            };
            if !info.connected || events.is_empty() {
                continue;
            }
            events.push(self.snapshot_event(Some(seat)));
            self.outbox.push(Delivery {
                to: info.player_id,
                events,
            });
        }
        reply
    }

    fn notify_others(&mut self, except: Option<SeatId>, event: ProtocolEvent) {
        for idx in 0..NUM_SEATS {
            let seat = idx as SeatId;
            if Some(seat) == except {
                continue;
            }
            let Some(info) = self.seats[idx] else {
                continue;
            };
            if !info.connected {
                continue;
            }
            let events = vec![event.clone(), self.snapshot_event(Some(seat))];
            self.outbox.push(Delivery {
                to: info.player_id,
                events,
            });
        }
    }
}
