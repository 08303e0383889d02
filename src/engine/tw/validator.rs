//! Win, listen and claim checks.
//!
//! Everything here is a pure function of its arguments. The meld search is a
//! plain backtracking decomposition: pick the lowest face left, try it as a
//! triplet, then as the bottom of a run. Because the lowest face can only ever
//! start a run, the middle and top alignments never need to be tried. Hands
//! hold at most seventeen tiles, so the brute force stays small; a tile-count
//! mismatch is rejected before any search starts.

use serde::{Deserialize, Serialize};

use super::hand::{MeldKind, SeatHand};
use super::tiles::{Tile, TileCounts, COPIES_PER_FACE};
use super::types::{MELDS_TO_WIN, WINNING_SIZE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "tile", rename_all = "snake_case")]
pub enum Group {
    /// Three consecutive faces, identified by the lowest.
    Run(Tile),
    Triplet(Tile),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decomposition {
    pub pair: Tile,
    pub groups: Vec<Group>,
}

impl Decomposition {
    pub fn runs(&self) -> impl Iterator<Item = Tile> + '_ {
        self.groups.iter().filter_map(|g| match g {
            Group::Run(t) => Some(*t),
            Group::Triplet(_) => None,
        })
    }

    pub fn triplets(&self) -> impl Iterator<Item = Tile> + '_ {
        self.groups.iter().filter_map(|g| match g {
            Group::Triplet(t) => Some(*t),
            Group::Run(_) => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum WinShape {
    Standard(Decomposition),
    /// Seven distinct pairs plus one triplet, fully concealed.
    PairsWithTriplet { triplet: Tile },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfKongKind {
    Concealed,
    Added,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelfKongOption {
    pub tile: Tile,
    pub kind: SelfKongKind,
}

/// Counts for `hidden + target` when the tile total fits `exposed` melds.
fn winning_counts(hidden: &[Tile], target: Option<Tile>, exposed: usize) -> Option<TileCounts> {
    if exposed > MELDS_TO_WIN {
        return None;
    }
    let total = hidden.len() + usize::from(target.is_some());
    if total + 3 * exposed != WINNING_SIZE {
        return None;
    }
    if hidden.iter().chain(target.iter()).any(|t| t.is_flower()) {
        return None;
    }
    let mut counts = TileCounts::from_tiles(hidden);
    if let Some(tile) = target {
        counts.add(tile);
    }
    if counts.iter().any(|(_, c)| c as usize > COPIES_PER_FACE) {
        return None;
    }
    Some(counts)
}

fn pairs_with_triplet(counts: &TileCounts) -> Option<Tile> {
    let mut pairs = 0;
    let mut triplet = None;
    for (tile, count) in counts.iter() {
        match count {
            2 => pairs += 1,
            3 if triplet.is_none() => triplet = Some(tile),
            _ => return None,
        }
    }
    if pairs == 7 {
        triplet
    } else {
        None
    }
}

fn run_from(counts: &TileCounts, low: Tile) -> Option<(Tile, Tile)> {
    let mid = low.succ()?;
    let high = mid.succ()?;
    if counts.get(mid) > 0 && counts.get(high) > 0 {
        Some((mid, high))
    } else {
        None
    }
}

fn remove_n(counts: &mut TileCounts, tile: Tile, n: usize) {
    for _ in 0..n {
        counts.remove(tile);
    }
}

fn add_n(counts: &mut TileCounts, tile: Tile, n: usize) {
    for _ in 0..n {
        counts.add(tile);
    }
}

fn has_melds(counts: &mut TileCounts) -> bool {
    let Some(low) = counts.first() else {
        return true;
    };
    if counts.total() % 3 != 0 {
        return false;
    }
    if counts.get(low) >= 3 {
        remove_n(counts, low, 3);
        let found = has_melds(counts);
        add_n(counts, low, 3);
        if found {
            return true;
        }
    }
    if let Some((mid, high)) = run_from(counts, low) {
        counts.remove(low);
        counts.remove(mid);
        counts.remove(high);
        let found = has_melds(counts);
        counts.add(low);
        counts.add(mid);
        counts.add(high);
        return found;
    }
    false
}

fn collect_melds(counts: &mut TileCounts, groups: &mut Vec<Group>, out: &mut Vec<Vec<Group>>) {
    let Some(low) = counts.first() else {
        out.push(groups.clone());
        return;
    };
    if counts.total() % 3 != 0 {
        return;
    }
    if counts.get(low) >= 3 {
        remove_n(counts, low, 3);
        groups.push(Group::Triplet(low));
        collect_melds(counts, groups, out);
        groups.pop();
        add_n(counts, low, 3);
    }
    if let Some((mid, high)) = run_from(counts, low) {
        counts.remove(low);
        counts.remove(mid);
        counts.remove(high);
        groups.push(Group::Run(low));
        collect_melds(counts, groups, out);
        groups.pop();
        counts.add(low);
        counts.add(mid);
        counts.add(high);
    }
}

/// Does `hidden + target` complete a winning hand next to `exposed` melds?
pub fn can_hu(hidden: &[Tile], target: Option<Tile>, exposed: usize) -> bool {
    let Some(mut counts) = winning_counts(hidden, target, exposed) else {
        return false;
    };
    if exposed == 0 && pairs_with_triplet(&counts).is_some() {
        return true;
    }
    let faces: Vec<(Tile, u8)> = counts.iter().collect();
    for (face, count) in faces {
        if count < 2 {
            continue;
        }
        remove_n(&mut counts, face, 2);
        let found = has_melds(&mut counts);
        add_n(&mut counts, face, 2);
        if found {
            return true;
        }
    }
    false
}

/// Every way `hidden + target` can be read as a winning hand.
pub fn winning_shapes(hidden: &[Tile], target: Option<Tile>, exposed: usize) -> Vec<WinShape> {
    let Some(mut counts) = winning_counts(hidden, target, exposed) else {
        return Vec::new();
    };
    let mut shapes = Vec::new();
    if exposed == 0 {
        if let Some(triplet) = pairs_with_triplet(&counts) {
            shapes.push(WinShape::PairsWithTriplet { triplet });
        }
    }
    let faces: Vec<(Tile, u8)> = counts.iter().collect();
    for (pair, count) in faces {
        if count < 2 {
            continue;
        }
        remove_n(&mut counts, pair, 2);
        let mut found = Vec::new();
        collect_melds(&mut counts, &mut Vec::new(), &mut found);
        add_n(&mut counts, pair, 2);
        shapes.extend(
            found
                .into_iter()
                .map(|groups| WinShape::Standard(Decomposition { pair, groups })),
        );
    }
    shapes
}

/// Faces that would complete the hand. Faces already held four times are
/// skipped since no copy is left to win on.
pub fn waiting_tiles(hidden: &[Tile], exposed: usize) -> Vec<Tile> {
    let counts = TileCounts::from_tiles(hidden);
    Tile::faces()
        .filter(|&face| (counts.get(face) as usize) < COPIES_PER_FACE)
        .filter(|&face| can_hu(hidden, Some(face), exposed))
        .collect()
}

pub fn can_ting(hidden: &[Tile], exposed: usize) -> bool {
    let counts = TileCounts::from_tiles(hidden);
    Tile::faces()
        .filter(|&face| (counts.get(face) as usize) < COPIES_PER_FACE)
        .any(|face| can_hu(hidden, Some(face), exposed))
}

/// Runs containing `tile` that the other two tiles in `hidden` can complete.
/// The caller enforces that only the seat after the discarder may chi.
pub fn chi_options(hidden: &[Tile], tile: Tile) -> Vec<[Tile; 3]> {
    if !tile.is_numbered() {
        return Vec::new();
    }
    let counts = TileCounts::from_tiles(hidden);
    let suit = tile.suit();
    let rank = tile.rank() as i8;
    let mut options = Vec::new();
    for low in (rank - 2)..=rank {
        let run: Option<Vec<Tile>> = (low..low + 3)
            .map(|r| u8::try_from(r).ok().and_then(|r| Tile::numbered(suit, r)))
            .collect();
        let Some(run) = run else {
            continue;
        };
        let mut needed = TileCounts::from_tiles(&run);
        needed.remove(tile);
        if needed.iter().all(|(t, n)| counts.get(t) >= n) {
            options.push([run[0], run[1], run[2]]);
        }
    }
    options
}

pub fn can_pong(hidden: &[Tile], tile: Tile) -> bool {
    !tile.is_flower() && hidden.iter().filter(|&&t| t == tile).count() >= 2
}

/// Exposed kong on a discard: three copies already held.
pub fn can_kong(hidden: &[Tile], tile: Tile) -> bool {
    !tile.is_flower() && hidden.iter().filter(|&&t| t == tile).count() >= 3
}

/// Concealed kongs (four in hand) and added kongs (pong plus the fourth tile).
pub fn self_kong_options(hand: &SeatHand) -> Vec<SelfKongOption> {
    let counts = hand.counts();
    let mut options: Vec<SelfKongOption> = counts
        .iter()
        .filter(|(_, c)| *c as usize == COPIES_PER_FACE)
        .map(|(tile, _)| SelfKongOption {
            tile,
            kind: SelfKongKind::Concealed,
        })
        .collect();
    for meld in &hand.melds {
        if meld.kind != MeldKind::Pong {
            continue;
        }
        if let Some(face) = meld.face() {
            if counts.get(face) > 0 {
                options.push(SelfKongOption {
                    tile: face,
                    kind: SelfKongKind::Added,
                });
            }
        }
    }
    options
}
