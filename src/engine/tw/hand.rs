use serde::{Deserialize, Serialize};

use super::tiles::{Tile, TileCounts};
use super::types::SeatId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeldKind {
    Chi,
    Pong,
    /// Claimed from a discard.
    ExposedKong,
    /// All four drawn by the owner; shown face down.
    ConcealedKong,
    /// A pong upgraded with the fourth tile.
    AddedKong,
}

impl MeldKind {
    pub fn is_kong(self) -> bool {
        matches!(
            self,
            MeldKind::ExposedKong | MeldKind::ConcealedKong | MeldKind::AddedKong
        )
    }

    pub fn is_concealed(self) -> bool {
        self == MeldKind::ConcealedKong
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meld {
    pub kind: MeldKind,
    pub tiles: Vec<Tile>,
    /// Seat the claimed tile came from; the owner for concealed kongs.
    pub from: SeatId,
}

impl Meld {
    pub fn new(kind: MeldKind, mut tiles: Vec<Tile>, from: SeatId) -> Self {
        tiles.sort();
        Self { kind, tiles, from }
    }

    /// Face of a pong or kong, lowest tile of a chi.
    pub fn face(&self) -> Option<Tile> {
        self.tiles.first().copied()
    }

    pub fn is_triplet_like(&self) -> bool {
        self.kind != MeldKind::Chi
    }
}

/// Everything one seat holds during a round.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatHand {
    /// Sorted hidden tiles.
    pub hidden: Vec<Tile>,
    pub melds: Vec<Meld>,
    pub discards: Vec<Tile>,
    pub flowers: Vec<Tile>,
    /// The tile most recently added by a draw this turn.
    pub last_drawn: Option<Tile>,
}

impl SeatHand {
    pub fn with_hidden(mut hidden: Vec<Tile>) -> Self {
        hidden.sort();
        Self {
            hidden,
            ..Self::default()
        }
    }

    pub fn add(&mut self, tile: Tile) {
        let pos = self.hidden.partition_point(|&t| t <= tile);
        self.hidden.insert(pos, tile);
    }

    pub fn contains(&self, tile: Tile) -> bool {
        self.hidden.binary_search(&tile).is_ok()
    }

    /// Remove one copy; `false` leaves the hand untouched.
    pub fn remove(&mut self, tile: Tile) -> bool {
        match self.hidden.binary_search(&tile) {
            Ok(pos) => {
                self.hidden.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Remove every tile in `tiles` or none of them.
    pub fn remove_all(&mut self, tiles: &[Tile]) -> bool {
        let mut needed = TileCounts::from_tiles(tiles);
        let available = TileCounts::from_tiles(&self.hidden);
        if needed.iter().any(|(tile, n)| available.get(tile) < n) {
            return false;
        }
        self.hidden.retain(|&t| !needed.remove(t));
        true
    }

    pub fn counts(&self) -> TileCounts {
        TileCounts::from_tiles(&self.hidden)
    }

    pub fn meld_count(&self) -> usize {
        self.melds.len()
    }

    /// No melds other than concealed kongs.
    pub fn is_concealed(&self) -> bool {
        self.melds.iter().all(|m| m.kind.is_concealed())
    }

    /// Tiles this seat accounts for in the 144-tile conservation sum.
    pub fn tile_total(&self) -> usize {
        self.hidden.len()
            + self.melds.iter().map(|m| m.tiles.len()).sum::<usize>()
            + self.discards.len()
            + self.flowers.len()
    }

    pub fn pong_of(&self, tile: Tile) -> Option<usize> {
        self.melds
            .iter()
            .position(|m| m.kind == MeldKind::Pong && m.face() == Some(tile))
    }

    /// Pull flowers out of the hidden tiles into the flower area.
    pub fn take_flowers(&mut self) -> Vec<Tile> {
        let (flowers, rest): (Vec<Tile>, Vec<Tile>) =
            self.hidden.iter().copied().partition(|t| t.is_flower());
        self.hidden = rest;
        self.flowers.extend(flowers.iter().copied());
        flowers
    }
}
