//! Tile faces for the 144-tile Taiwanese set.
//!
//! Face ids 0..34 are the playable faces (four copies each), ids 34..42 are the
//! eight single flower tiles. Copies are indistinguishable, so a `Tile` is just
//! its face id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const NUM_FACES: usize = 34;
pub const NUM_FLOWERS: usize = 8;
pub const COPIES_PER_FACE: usize = 4;
pub const TOTAL_TILES: usize = NUM_FACES * COPIES_PER_FACE + NUM_FLOWERS;

const CHARACTERS_START: u8 = 0;
const DOTS_START: u8 = 9;
const BAMBOO_START: u8 = 18;
const WINDS_START: u8 = 27;
const DRAGONS_START: u8 = 31;
const SEASONS_START: u8 = 34;
const PLANTS_START: u8 = 38;
const END: u8 = 42;

const NAMES: [&str; END as usize] = [
    "一萬", "二萬", "三萬", "四萬", "五萬", "六萬", "七萬", "八萬", "九萬", //
    "一筒", "二筒", "三筒", "四筒", "五筒", "六筒", "七筒", "八筒", "九筒", //
    "一條", "二條", "三條", "四條", "五條", "六條", "七條", "八條", "九條", //
    "東", "南", "西", "北", "中", "發", "白", //
    "春", "夏", "秋", "冬", "梅", "蘭", "竹", "菊",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suit {
    Characters,
    Dots,
    Bamboo,
    Winds,
    Dragons,
    Flowers,
}

impl Suit {
    pub fn is_numbered(self) -> bool {
        matches!(self, Suit::Characters | Suit::Dots | Suit::Bamboo)
    }

    pub fn is_honor(self) -> bool {
        matches!(self, Suit::Winds | Suit::Dragons)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wind {
    East,
    South,
    West,
    North,
}

impl Wind {
    pub const ALL: [Wind; 4] = [Wind::East, Wind::South, Wind::West, Wind::North];

    pub fn from_index(index: usize) -> Wind {
        Self::ALL[index % 4]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn tile(self) -> Tile {
        Tile(WINDS_START + self as u8)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dragon {
    Red,
    Green,
    White,
}

impl Dragon {
    pub const ALL: [Dragon; 3] = [Dragon::Red, Dragon::Green, Dragon::White];

    pub fn tile(self) -> Tile {
        Tile(DRAGONS_START + self as u8)
    }
}

/// A single tile face.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Tile(u8);

impl Tile {
    pub const fn new(id: u8) -> Option<Tile> {
        if id < END {
            Some(Tile(id))
        } else {
            None
        }
    }

    /// Numbered tile, `rank` in 1..=9.
    pub fn numbered(suit: Suit, rank: u8) -> Option<Tile> {
        if !(1..=9).contains(&rank) {
            return None;
        }
        let start = match suit {
            Suit::Characters => CHARACTERS_START,
            Suit::Dots => DOTS_START,
            Suit::Bamboo => BAMBOO_START,
            _ => return None,
        };
        Some(Tile(start + rank - 1))
    }

    pub const fn id(self) -> u8 {
        self.0
    }

    /// Index into a [`TileCounts`] table. Only meaningful for non-flowers.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub fn suit(self) -> Suit {
        match self.0 {
            0..=8 => Suit::Characters,
            9..=17 => Suit::Dots,
            18..=26 => Suit::Bamboo,
            27..=30 => Suit::Winds,
            31..=33 => Suit::Dragons,
            _ => Suit::Flowers,
        }
    }

    /// 1..=9 for numbered tiles, 1..=4 for winds and flowers within their set,
    /// 1..=3 for dragons.
    pub fn rank(self) -> u8 {
        match self.suit() {
            Suit::Characters => self.0 - CHARACTERS_START + 1,
            Suit::Dots => self.0 - DOTS_START + 1,
            Suit::Bamboo => self.0 - BAMBOO_START + 1,
            Suit::Winds => self.0 - WINDS_START + 1,
            Suit::Dragons => self.0 - DRAGONS_START + 1,
            Suit::Flowers => (self.0 - SEASONS_START) % 4 + 1,
        }
    }

    pub fn is_flower(self) -> bool {
        self.0 >= SEASONS_START
    }

    pub fn is_honor(self) -> bool {
        self.suit().is_honor()
    }

    pub fn is_numbered(self) -> bool {
        self.suit().is_numbered()
    }

    pub fn wind(self) -> Option<Wind> {
        match self.suit() {
            Suit::Winds => Some(Wind::from_index((self.0 - WINDS_START) as usize)),
            _ => None,
        }
    }

    pub fn dragon(self) -> Option<Dragon> {
        match self.suit() {
            Suit::Dragons => Some(Dragon::ALL[(self.0 - DRAGONS_START) as usize]),
            _ => None,
        }
    }

    /// The seat wind a flower belongs to (春/梅 East, 夏/蘭 South, ...).
    pub fn flower_wind(self) -> Option<Wind> {
        if self.is_flower() {
            Some(Wind::from_index(((self.0 - SEASONS_START) % 4) as usize))
        } else {
            None
        }
    }

    /// Seasons are 春夏秋冬, plants are 梅蘭竹菊.
    pub fn is_season(self) -> bool {
        (SEASONS_START..PLANTS_START).contains(&self.0)
    }

    /// Next face in the same numbered suit.
    pub fn succ(self) -> Option<Tile> {
        if self.is_numbered() && self.rank() < 9 {
            Some(Tile(self.0 + 1))
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        NAMES[self.0 as usize]
    }

    /// All 34 playable faces in id order.
    pub fn faces() -> impl Iterator<Item = Tile> {
        (0..NUM_FACES as u8).map(Tile)
    }

    pub fn flowers() -> impl Iterator<Item = Tile> {
        (SEASONS_START..END).map(Tile)
    }

    /// The full 144-tile set, unshuffled.
    pub fn full_set() -> Vec<Tile> {
        let mut tiles = Vec::with_capacity(TOTAL_TILES);
        for face in Tile::faces() {
            tiles.extend(std::iter::repeat(face).take(COPIES_PER_FACE));
        }
        tiles.extend(Tile::flowers());
        tiles
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tile name `{0}`")]
pub struct ParseTileError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("tile id {0} is out of range")]
pub struct InvalidTileId(pub u8);

impl TryFrom<u8> for Tile {
    type Error = InvalidTileId;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Tile::new(id).ok_or(InvalidTileId(id))
    }
}

impl From<Tile> for u8 {
    fn from(tile: Tile) -> u8 {
        tile.0
    }
}

impl FromStr for Tile {
    type Err = ParseTileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        NAMES
            .iter()
            .position(|name| *name == trimmed)
            .map(|id| Tile(id as u8))
            .ok_or_else(|| ParseTileError(trimmed.to_string()))
    }
}

/// Per-face multiset over the 34 playable faces. Flowers are ignored.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCounts([u8; NUM_FACES]);

impl TileCounts {
    pub fn new() -> Self {
        Self([0; NUM_FACES])
    }

    pub fn from_tiles<'a>(tiles: impl IntoIterator<Item = &'a Tile>) -> Self {
        let mut counts = Self::new();
        for tile in tiles {
            counts.add(*tile);
        }
        counts
    }

    pub fn add(&mut self, tile: Tile) {
        if !tile.is_flower() {
            self.0[tile.index()] += 1;
        }
    }

    pub fn remove(&mut self, tile: Tile) -> bool {
        if tile.is_flower() || self.0[tile.index()] == 0 {
            return false;
        }
        self.0[tile.index()] -= 1;
        true
    }

    pub fn get(&self, tile: Tile) -> u8 {
        if tile.is_flower() {
            0
        } else {
            self.0[tile.index()]
        }
    }

    pub fn total(&self) -> usize {
        self.0.iter().map(|&c| c as usize).sum()
    }

    /// Lowest face still present.
    pub fn first(&self) -> Option<Tile> {
        self.0.iter().position(|&c| c > 0).map(|i| Tile(i as u8))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tile, u8)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(i, &c)| (Tile(i as u8), c))
    }
}

impl Default for TileCounts {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TileCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::serde::assert_round_trip_eq;

    #[test]
    fn full_set_has_144_tiles_with_eight_distinct_flowers() {
        let set = Tile::full_set();
        assert_eq!(set.len(), TOTAL_TILES);
        assert_eq!(set.iter().filter(|t| t.is_flower()).count(), 8);
        let counts = TileCounts::from_tiles(&set);
        assert!(Tile::faces().all(|face| counts.get(face) == 4));
    }

    #[test]
    fn names_parse_back_to_the_same_face() {
        for id in 0..END {
            let tile = Tile::new(id).unwrap();
            assert_eq!(tile.name().parse::<Tile>().unwrap(), tile);
        }
        assert!("十萬".parse::<Tile>().is_err());
    }

    #[test]
    fn suits_ranks_and_honors() {
        let five_dots: Tile = "五筒".parse().unwrap();
        assert_eq!(five_dots.suit(), Suit::Dots);
        assert_eq!(five_dots.rank(), 5);
        assert_eq!(Tile::numbered(Suit::Dots, 5), Some(five_dots));

        let green: Tile = "發".parse().unwrap();
        assert_eq!(green.dragon(), Some(Dragon::Green));
        assert!(green.is_honor());
        assert_eq!(green.succ(), None);

        let north: Tile = "北".parse().unwrap();
        assert_eq!(north.wind(), Some(Wind::North));
        assert_eq!(Wind::North.tile(), north);

        assert_eq!("九條".parse::<Tile>().unwrap().succ(), None);
    }

    #[test]
    fn flowers_map_to_seat_winds() {
        let summer: Tile = "夏".parse().unwrap();
        let orchid: Tile = "蘭".parse().unwrap();
        assert_eq!(summer.flower_wind(), Some(Wind::South));
        assert_eq!(orchid.flower_wind(), Some(Wind::South));
        assert!(summer.is_season());
        assert!(!orchid.is_season());
    }

    #[test]
    fn tiles_serialize_as_ids() {
        let tile: Tile = "白".parse().unwrap();
        assert_eq!(serde_json::to_string(&tile).unwrap(), "33");
        assert_round_trip_eq(&tile);
        assert_round_trip_eq(&Wind::West);
    }

    #[test]
    fn out_of_range_ids_fail_to_decode() {
        assert!(serde_json::from_str::<Tile>("41").is_ok());
        let err = serde_json::from_str::<Tile>("42").unwrap_err();
        assert!(err.to_string().contains("tile id 42 is out of range"));
        assert!(serde_json::from_str::<Vec<Tile>>("[0, 200]").is_err());
        assert_eq!(Tile::try_from(200), Err(InvalidTileId(200)));
    }
}
