//! Full table state as one player may see it. Other seats' hidden tiles are
//! reduced to counts and their concealed kongs to face-down melds.

use serde::{Deserialize, Serialize};

use super::TableId;
use crate::engine::tw::{
    legal_actions, ClaimSource, Decision, GamePhase, LegalActions, ListenKind, Meld, MeldKind,
    PlayerId, Points, SeatId, Tile, TurnStep, Wind, NUM_SEATS,
};
use crate::game::MatchController;

/// Seat occupancy as tracked by the adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatInfo {
    pub player_id: PlayerId,
    pub connected: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeldView {
    pub kind: MeldKind,
    /// Empty for another seat's concealed kong.
    pub tiles: Vec<Tile>,
    pub from: SeatId,
}

impl MeldView {
    fn of(meld: &Meld, visible: bool) -> Self {
        let hidden = meld.kind == MeldKind::ConcealedKong && !visible;
        Self {
            kind: meld.kind,
            tiles: if hidden { Vec::new() } else { meld.tiles.clone() },
            from: meld.from,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    pub seat: SeatId,
    pub player_id: Option<PlayerId>,
    pub connected: bool,
    pub score: Points,
    pub melds: Vec<MeldView>,
    pub discards: Vec<Tile>,
    pub flowers: Vec<Tile>,
    pub listening: Option<ListenKind>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimView {
    pub window: u64,
    pub source: ClaimSource,
    pub from: SeatId,
    pub tile: Tile,
    /// Seats that still owe a decision.
    pub pending: Vec<SeatId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateView {
    pub seat: SeatId,
    pub my_hand: Vec<Tile>,
    pub last_drawn: Option<Tile>,
    pub legal: LegalActions,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    pub table_id: TableId,
    #[serde(rename = "gamePhase")]
    pub phase: GamePhase,
    pub round: u32,
    pub max_rounds: u32,
    #[serde(rename = "dealerIndex")]
    pub dealer: SeatId,
    /// Seat holding East for the whole match.
    pub wind_start: SeatId,
    pub round_wind: Wind,
    pub turn: SeatId,
    pub step: TurnStep,
    pub wall_count: usize,
    pub hand_counts: [usize; NUM_SEATS],
    pub seats: Vec<SeatView>,
    #[serde(rename = "claimingState")]
    pub claim: Option<ClaimView>,
    pub ting_seat: Option<SeatId>,
    pub finished: bool,
    pub me: Option<PrivateView>,
}

pub fn build_snapshot(
    table_id: TableId,
    seats: &[Option<SeatInfo>; NUM_SEATS],
    ctl: &MatchController,
    viewer: Option<SeatId>,
) -> TableSnapshot {
    let scores = ctl.scores();
    let hand = ctl.hand();
    let seat_views = (0..NUM_SEATS)
        .map(|idx| {
            let seat = idx as SeatId;
            let info = seats[idx];
            let mut view = SeatView {
                seat,
                player_id: info.map(|i| i.player_id),
                connected: info.is_some_and(|i| i.connected),
                score: scores[idx],
                melds: Vec::new(),
                discards: Vec::new(),
                flowers: Vec::new(),
                listening: None,
            };
            if let Some(state) = hand {
                let held = state.seat(seat);
                let visible = viewer == Some(seat);
                view.melds = held.melds.iter().map(|m| MeldView::of(m, visible)).collect();
                view.discards = held.discards.clone();
                view.flowers = held.flowers.clone();
                view.listening = state.locks[idx].as_ref().map(|lock| lock.kind);
            }
            view
        })
        .collect();

    let Some(state) = hand else {
        return TableSnapshot {
            table_id,
            phase: GamePhase::Waiting,
            round: ctl.round(),
            max_rounds: ctl.max_rounds(),
            dealer: ctl.dealer(),
            wind_start: 0,
            round_wind: ctl.round_wind(),
            turn: ctl.dealer(),
            step: TurnStep::AwaitingDraw,
            wall_count: 0,
            hand_counts: [0; NUM_SEATS],
            seats: seat_views,
            claim: None,
            ting_seat: None,
            finished: ctl.is_finished(),
            me: viewer.map(|seat| PrivateView {
                seat,
                my_hand: Vec::new(),
                last_drawn: None,
                legal: LegalActions::default(),
            }),
        };
    };

    let claim = state.claiming.as_ref().map(|c| ClaimView {
        window: c.window,
        source: c.source,
        from: c.from,
        tile: c.tile,
        pending: c
            .options
            .iter()
            .filter(|o| o.decision == Decision::Undecided)
            .map(|o| o.seat)
            .collect(),
    });
    let me = viewer.map(|seat| {
        let held = state.seat(seat);
        PrivateView {
            seat,
            my_hand: held.hidden.clone(),
            last_drawn: held.last_drawn,
            legal: legal_actions(state, seat),
        }
    });
    TableSnapshot {
        table_id,
        phase: state.phase,
        round: state.round,
        max_rounds: ctl.max_rounds(),
        dealer: state.dealer,
        wind_start: 0,
        round_wind: state.round_wind,
        turn: state.turn,
        step: state.step,
        wall_count: state.wall.len(),
        hand_counts: state.hand_counts(),
        seats: seat_views,
        claim,
        ting_seat: state.ting.as_ref().map(|t| t.seat),
        finished: ctl.is_finished(),
        me,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomSettings;
    use crate::test_utils::serde::assert_round_trip_eq;
    use uuid::Uuid;

    fn seated() -> [Option<SeatInfo>; NUM_SEATS] {
        [0, 1, 2, 3].map(|i| {
            Some(SeatInfo {
                player_id: 100 + i,
                connected: true,
            })
        })
    }

    #[test]
    fn other_seats_only_show_counts() {
        let mut ctl = MatchController::new(RoomSettings::default(), false, Some(3));
        ctl.start_round(RoomSettings::default());
        let snap = build_snapshot(Uuid::nil(), &seated(), &ctl, Some(2));
        assert_eq!(snap.phase, GamePhase::Playing);
        assert_eq!(snap.hand_counts, [16; NUM_SEATS]);
        let me = snap.me.as_ref().unwrap();
        assert_eq!(me.seat, 2);
        assert_eq!(me.my_hand.len(), 16);
        assert_eq!(snap.seats[0].player_id, Some(100));
        assert!(build_snapshot(Uuid::nil(), &seated(), &ctl, None).me.is_none());
        assert_round_trip_eq(&snap);
    }

    #[test]
    fn concealed_kongs_are_face_down_for_others() {
        let meld = Meld::new(MeldKind::ConcealedKong, vec![Tile::faces().next().unwrap(); 4], 1);
        assert!(MeldView::of(&meld, false).tiles.is_empty());
        assert_eq!(MeldView::of(&meld, true).tiles.len(), 4);
    }

    #[test]
    fn table_fields_use_wire_names() {
        let mut ctl = MatchController::new(RoomSettings::default(), false, Some(5));
        ctl.start_round(RoomSettings::default());
        let snap = build_snapshot(Uuid::nil(), &seated(), &ctl, None);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["dealerIndex"], ctl.dealer());
        assert_eq!(json["windStart"], 0);
        assert!(json.get("gamePhase").is_some());
        assert!(json["claimingState"].is_null());
    }

    #[test]
    fn waiting_tables_have_no_hand() {
        let ctl = MatchController::new(RoomSettings::default(), false, None);
        let snap = build_snapshot(Uuid::nil(), &[None; NUM_SEATS], &ctl, None);
        assert_eq!(snap.phase, GamePhase::Waiting);
        assert_eq!(snap.wall_count, 0);
        assert!(snap.seats.iter().all(|s| s.player_id.is_none()));
    }
}
