use serde::{Deserialize, Serialize};

use super::snapshot::TableSnapshot;
use crate::engine::tw::{
    ClaimKind, ClaimOption, ClaimSource, ListenKind, Meld, PlayerId, Points, SeatId,
    SelfKongKind, Tai, TableEvent, Tile, TurnStep, Wind, NUM_SEATS,
};
use crate::game::RoundRecord;

/// Engine → transport events. Private variants are only ever addressed to
/// the seat they describe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ProtocolEvent {
    RoundStart {
        round: u32,
        max_rounds: u32,
        dealer: SeatId,
        round_wind: Wind,
    },
    /// Private: the seat's hidden tiles after dealing and flower replacement.
    HandSync {
        seat: SeatId,
        hand: Vec<Tile>,
        flowers: Vec<Tile>,
    },
    FlowerReplaced {
        seat: SeatId,
        flowers: Vec<Tile>,
    },
    /// `tile` is only filled in for the drawing seat.
    TileDrawn {
        seat: SeatId,
        tile: Option<Tile>,
        from_tail: bool,
    },
    TurnStarted {
        seat: SeatId,
        step: TurnStep,
    },
    Discarded {
        seat: SeatId,
        tile: Tile,
        auto: bool,
    },
    /// Private: offer to declare listening.
    TingRequest {
        seat: SeatId,
        window: u64,
        kind: ListenKind,
        waits: Vec<Tile>,
    },
    TingDeclared {
        seat: SeatId,
        kind: ListenKind,
    },
    TingRevoked {
        seat: SeatId,
    },
    /// Private: the receiving seat's own claim option.
    ClaimRequest {
        window: u64,
        source: ClaimSource,
        from: SeatId,
        tile: Tile,
        options: Vec<ClaimOption>,
    },
    ClaimExecuted {
        seat: SeatId,
        claim: ClaimKind,
        from: SeatId,
        tile: Tile,
        meld: Option<Meld>,
    },
    /// `tile` is withheld from other seats for a concealed kong.
    KongDeclared {
        seat: SeatId,
        kind: SelfKongKind,
        tile: Option<Tile>,
    },
    KongReverted {
        seat: SeatId,
        tile: Tile,
    },
    HuDeclared {
        seat: SeatId,
        discarder: Option<SeatId>,
        win_tile: Option<Tile>,
        hand: Vec<Tile>,
        patterns: Vec<String>,
        tai: Tai,
        amount: Points,
        scores: [Points; NUM_SEATS],
    },
    RoundDrawn,
    RoundEnd {
        round: u32,
        winner: Option<SeatId>,
        deltas: [Points; NUM_SEATS],
        scores: [Points; NUM_SEATS],
        is_last_round: bool,
    },
    GameEnd {
        final_scores: [Points; NUM_SEATS],
        history: Vec<RoundRecord>,
    },
    PlayerJoined {
        player_id: PlayerId,
        seat: SeatId,
    },
    PlayerLeft {
        player_id: PlayerId,
        seat: SeatId,
        /// The match is running and the seat stays, played by timers.
        kept_seat: bool,
    },
    Rejected {
        code: String,
        client_seq: Option<u64>,
    },
    TableSnapshot(Box<TableSnapshot>),
}

impl ProtocolEvent {
    pub fn rejected(code: &str, client_seq: Option<u64>) -> Self {
        ProtocolEvent::Rejected {
            code: code.to_string(),
            client_seq,
        }
    }

    pub fn rejection_code(&self) -> Option<&str> {
        match self {
            ProtocolEvent::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn as_snapshot(&self) -> Option<&TableSnapshot> {
        match self {
            ProtocolEvent::TableSnapshot(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// What `viewer` gets to see of an engine event, if anything.
    pub fn project(event: &TableEvent, viewer: SeatId) -> Option<Self> {
        let projected = match event {
            TableEvent::RoundStarted { .. } | TableEvent::HandDealt { .. } => return None,
            TableEvent::FlowerReplaced { seat, flowers } => ProtocolEvent::FlowerReplaced {
                seat: *seat,
                flowers: flowers.clone(),
            },
            TableEvent::TileDrawn {
                seat,
                tile,
                from_tail,
            } => ProtocolEvent::TileDrawn {
                seat: *seat,
                tile: (*seat == viewer).then_some(*tile),
                from_tail: *from_tail,
            },
            TableEvent::TurnStarted { seat, step } => ProtocolEvent::TurnStarted {
                seat: *seat,
                step: *step,
            },
            TableEvent::Discarded { seat, tile, auto } => ProtocolEvent::Discarded {
                seat: *seat,
                tile: *tile,
                auto: *auto,
            },
            TableEvent::TingWindowOpened {
                seat,
                window,
                kind,
                waits,
            } => {
                if *seat != viewer {
                    return None;
                }
                ProtocolEvent::TingRequest {
                    seat: *seat,
                    window: *window,
                    kind: *kind,
                    waits: waits.clone(),
                }
            }
            TableEvent::TingDeclared { seat, kind } => ProtocolEvent::TingDeclared {
                seat: *seat,
                kind: *kind,
            },
            TableEvent::TingRevoked { seat } => ProtocolEvent::TingRevoked { seat: *seat },
            TableEvent::ClaimWindowOpened {
                window,
                source,
                from,
                tile,
                options,
            } => {
                let mine: Vec<ClaimOption> = options
                    .iter()
                    .filter(|o| o.seat == viewer)
                    .cloned()
                    .collect();
                if mine.is_empty() {
                    return None;
                }
                ProtocolEvent::ClaimRequest {
                    window: *window,
                    source: *source,
                    from: *from,
                    tile: *tile,
                    options: mine,
                }
            }
            TableEvent::ClaimExecuted {
                seat,
                kind,
                from,
                tile,
                meld,
            } => ProtocolEvent::ClaimExecuted {
                seat: *seat,
                claim: *kind,
                from: *from,
                tile: *tile,
                meld: meld.clone(),
            },
            TableEvent::KongDeclared { seat, kind, tile } => {
                let visible = *seat == viewer || *kind == SelfKongKind::Added;
                ProtocolEvent::KongDeclared {
                    seat: *seat,
                    kind: *kind,
                    tile: visible.then_some(*tile),
                }
            }
            TableEvent::KongReverted { seat, tile } => ProtocolEvent::KongReverted {
                seat: *seat,
                tile: *tile,
            },
            TableEvent::HuDeclared {
                seat,
                discarder,
                win_tile,
                hand,
                sheet,
                settlement,
            } => ProtocolEvent::HuDeclared {
                seat: *seat,
                discarder: *discarder,
                win_tile: *win_tile,
                hand: hand.clone(),
                patterns: sheet.labels(),
                tai: sheet.total,
                amount: settlement.amount,
                scores: settlement.deltas,
            },
            TableEvent::RoundDrawn => ProtocolEvent::RoundDrawn,
        };
        Some(projected)
    }
}
