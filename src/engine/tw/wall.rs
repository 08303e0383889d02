use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::VecDeque;

use super::tiles::Tile;
use super::types::{SeatId, HAND_SIZE, NUM_SEATS};

/// The undealt tiles. Normal draws come off the head, kong and flower
/// replacements come off the tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wall {
    tiles: VecDeque<Tile>,
}

impl Wall {
    /// Shuffle a fresh 144-tile set. With a seed the wall is reproducible; the
    /// round number is mixed in so consecutive rounds differ.
    pub fn shuffled(seed: Option<u64>, round: u32) -> Self {
        let mut tiles = Tile::full_set();
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(splitmix64(seed.wrapping_add(round as u64))),
            None => StdRng::from_entropy(),
        };
        tiles.shuffle(&mut rng);
        Self {
            tiles: tiles.into(),
        }
    }

    /// A wall in exactly the given draw order (head first).
    pub fn from_tiles(tiles: Vec<Tile>) -> Self {
        Self {
            tiles: tiles.into(),
        }
    }

    pub fn empty() -> Self {
        Self {
            tiles: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn draw_front(&mut self) -> Option<Tile> {
        self.tiles.pop_front()
    }

    pub fn draw_back(&mut self) -> Option<Tile> {
        self.tiles.pop_back()
    }

    pub fn draw(&mut self, from_tail: bool) -> Option<Tile> {
        if from_tail {
            self.draw_back()
        } else {
            self.draw_front()
        }
    }

    /// Deal sixteen tiles per seat in passes of four, starting with `first`.
    pub fn deal(&mut self, first: SeatId) -> [Vec<Tile>; NUM_SEATS] {
        let mut hands: [Vec<Tile>; NUM_SEATS] = Default::default();
        for _pass in 0..HAND_SIZE / 4 {
            for offset in 0..NUM_SEATS {
                let seat = (first as usize + offset) % NUM_SEATS;
                for _ in 0..4 {
                    if let Some(tile) = self.tiles.pop_front() {
                        hands[seat].push(tile);
                    }
                }
            }
        }
        hands
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }
}

impl Default for Wall {
    fn default() -> Self {
        Self::empty()
    }
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tw::tiles::TOTAL_TILES;

    #[test]
    fn seeded_walls_repeat_and_vary_by_round() {
        let a = Wall::shuffled(Some(42), 1);
        let b = Wall::shuffled(Some(42), 1);
        let c = Wall::shuffled(Some(42), 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), TOTAL_TILES);
    }

    #[test]
    fn deal_gives_sixteen_each_and_keeps_the_rest() {
        let mut wall = Wall::shuffled(Some(7), 1);
        let hands = wall.deal(2);
        for hand in &hands {
            assert_eq!(hand.len(), HAND_SIZE);
        }
        assert_eq!(wall.len(), TOTAL_TILES - HAND_SIZE * NUM_SEATS);
    }

    #[test]
    fn head_and_tail_draws() {
        let one: Tile = "一萬".parse().unwrap();
        let two: Tile = "二萬".parse().unwrap();
        let three: Tile = "三萬".parse().unwrap();
        let mut wall = Wall::from_tiles(vec![one, two, three]);
        assert_eq!(wall.draw(false), Some(one));
        assert_eq!(wall.draw(true), Some(three));
        assert_eq!(wall.draw_front(), Some(two));
        assert_eq!(wall.draw_back(), None);
        assert!(wall.is_empty());
    }
}
