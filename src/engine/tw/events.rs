use serde::{Deserialize, Serialize};

use super::claims::{ClaimOption, ClaimSource};
use super::hand::Meld;
use super::scoring::{ScoreSheet, Settlement};
use super::tiles::{Tile, Wind};
use super::types::{ClaimKind, ListenKind, SeatId, TurnStep};
use super::validator::SelfKongKind;

/// Engine-level record of what happened. Some variants carry private tiles;
/// the protocol layer decides who gets to see them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableEvent {
    RoundStarted {
        round: u32,
        dealer: SeatId,
        round_wind: Wind,
    },
    HandDealt {
        seat: SeatId,
        tiles: Vec<Tile>,
    },
    FlowerReplaced {
        seat: SeatId,
        flowers: Vec<Tile>,
    },
    TileDrawn {
        seat: SeatId,
        tile: Tile,
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
    TingWindowOpened {
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
    ClaimWindowOpened {
        window: u64,
        source: ClaimSource,
        from: SeatId,
        tile: Tile,
        options: Vec<ClaimOption>,
    },
    ClaimExecuted {
        seat: SeatId,
        kind: ClaimKind,
        from: SeatId,
        tile: Tile,
        meld: Option<Meld>,
    },
    KongDeclared {
        seat: SeatId,
        kind: SelfKongKind,
        tile: Tile,
    },
    /// An added kong was robbed and went back to being a pong.
    KongReverted {
        seat: SeatId,
        tile: Tile,
    },
    HuDeclared {
        seat: SeatId,
        discarder: Option<SeatId>,
        win_tile: Option<Tile>,
        hand: Vec<Tile>,
        sheet: ScoreSheet,
        settlement: Settlement,
    },
    RoundDrawn,
}
