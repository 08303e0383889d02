//! Tai calculation and settlement for a declared win.
//!
//! Patterns that only depend on which tiles are held (winds, dragons, suits,
//! flowers, win circumstances) are always evaluated. Patterns that depend on
//! how the hand splits into melds are evaluated for every reading the
//! validator finds and the best-scoring reading is kept.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::hand::{Meld, MeldKind};
use super::tiles::{Dragon, Suit, Tile, TileCounts, Wind, NUM_FLOWERS};
use super::types::{ListenKind, Points, SeatId, Tai, NUM_SEATS};
use super::validator::{waiting_tiles, winning_shapes, Decomposition, WinShape};
use crate::config::PointCap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandPattern {
    Dealer,
    SelfDrawn,
    Concealed,
    ConcealedSelfDrawn,
    SeatWind,
    RoundWind,
    DragonTriplets,
    SeatFlower,
    FlowerSet,
    EightFlowers,
    ThreeConcealedTriplets,
    FourConcealedTriplets,
    FiveConcealedTriplets,
    AllTriplets,
    MixedOneSuit,
    PureOneSuit,
    AllHonors,
    SmallThreeDragons,
    BigThreeDragons,
    SmallFourWinds,
    BigFourWinds,
    AllChows,
    AllExposed,
    PairsWithTriplet,
    LastTileSelfDrawn,
    LastTileDiscard,
    RobbingTheKong,
    WinOnKongReplacement,
    UniqueWait,
    DeclaredTing,
    EarthlyTing,
    HeavenlyTing,
    EarthlyWin,
    HeavenlyWin,
}

impl HandPattern {
    pub fn label(self) -> &'static str {
        use HandPattern::*;
        match self {
            Dealer => "莊家",
            SelfDrawn => "自摸",
            Concealed => "門清",
            ConcealedSelfDrawn => "門清自摸",
            SeatWind => "門風台",
            RoundWind => "圈風台",
            DragonTriplets => "三元台",
            SeatFlower => "正花",
            FlowerSet => "花槓",
            EightFlowers => "八仙過海",
            ThreeConcealedTriplets => "三暗刻",
            FourConcealedTriplets => "四暗刻",
            FiveConcealedTriplets => "五暗刻",
            AllTriplets => "碰碰胡",
            MixedOneSuit => "混一色",
            PureOneSuit => "清一色",
            AllHonors => "字一色",
            SmallThreeDragons => "小三元",
            BigThreeDragons => "大三元",
            SmallFourWinds => "小四喜",
            BigFourWinds => "大四喜",
            AllChows => "平胡",
            AllExposed => "全求人",
            PairsWithTriplet => "嚦咕嚦咕",
            LastTileSelfDrawn => "海底撈月",
            LastTileDiscard => "河底撈魚",
            RobbingTheKong => "搶槓",
            WinOnKongReplacement => "槓上開花",
            UniqueWait => "獨聽",
            DeclaredTing => "報聽",
            EarthlyTing => "地聽",
            HeavenlyTing => "天聽",
            EarthlyWin => "地胡",
            HeavenlyWin => "天胡",
        }
    }

    /// Fixed value. Per-unit patterns (dragon triplets, seat flowers, flower
    /// sets) report the value of a single unit.
    pub fn base_tai(self) -> Tai {
        use HandPattern::*;
        match self {
            Dealer | SelfDrawn | Concealed | SeatWind | RoundWind | DragonTriplets
            | SeatFlower | LastTileSelfDrawn | LastTileDiscard | RobbingTheKong
            | WinOnKongReplacement | UniqueWait | DeclaredTing => 1,
            FlowerSet | ThreeConcealedTriplets | AllChows | AllExposed => 2,
            ConcealedSelfDrawn => 3,
            AllTriplets | MixedOneSuit | SmallThreeDragons | EarthlyTing => 4,
            FourConcealedTriplets => 5,
            EightFlowers | FiveConcealedTriplets | PureOneSuit | BigThreeDragons
            | SmallFourWinds | PairsWithTriplet | HeavenlyTing => 8,
            AllHonors | BigFourWinds | EarthlyWin => 16,
            HeavenlyWin => 24,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaiItem {
    pub pattern: HandPattern,
    pub tai: Tai,
}

impl TaiItem {
    fn single(pattern: HandPattern) -> Self {
        Self {
            pattern,
            tai: pattern.base_tai(),
        }
    }

    fn times(pattern: HandPattern, units: usize) -> Self {
        Self {
            pattern,
            tai: pattern.base_tai() * units as Tai,
        }
    }
}

impl fmt::Display for TaiItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.pattern.label(), self.tai)
    }
}

/// Everything about a win that is not visible from the tiles alone.
#[derive(Clone, Debug)]
pub struct WinContext<'a> {
    /// Hidden tiles, not counting `win_tile`.
    pub hidden: &'a [Tile],
    pub win_tile: Option<Tile>,
    pub melds: &'a [Meld],
    pub flowers: &'a [Tile],
    pub seat_wind: Wind,
    pub round_wind: Wind,
    pub is_dealer: bool,
    pub self_drawn: bool,
    pub last_tile: bool,
    pub robbed_kong: bool,
    pub after_kong: bool,
    pub listen: Option<ListenKind>,
    pub heavenly_win: bool,
    pub earthly_win: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSheet {
    pub items: Vec<TaiItem>,
    pub total: Tai,
}

impl ScoreSheet {
    pub fn labels(&self) -> Vec<String> {
        self.items.iter().map(ToString::to_string).collect()
    }

    pub fn has(&self, pattern: HandPattern) -> bool {
        self.items.iter().any(|item| item.pattern == pattern)
    }
}

pub fn calculate_tai(ctx: &WinContext<'_>, cap: PointCap) -> ScoreSheet {
    let mut all: Vec<Tile> = ctx.hidden.to_vec();
    all.extend(ctx.win_tile);
    for meld in ctx.melds {
        all.extend(meld.tiles.iter().copied());
    }
    let counts = TileCounts::from_tiles(&all);

    let mut items = Vec::new();
    win_items(ctx, &mut items);
    wind_items(ctx, &counts, &mut items);
    dragon_items(&counts, &mut items);
    flower_items(ctx, &mut items);
    suit_items(&counts, &mut items);

    if ctx.last_tile {
        items.push(TaiItem::single(if ctx.self_drawn {
            HandPattern::LastTileSelfDrawn
        } else {
            HandPattern::LastTileDiscard
        }));
    }
    if ctx.robbed_kong {
        items.push(TaiItem::single(HandPattern::RobbingTheKong));
    }
    if ctx.after_kong && ctx.self_drawn {
        items.push(TaiItem::single(HandPattern::WinOnKongReplacement));
    }
    match ctx.listen {
        Some(ListenKind::Heavenly) => items.push(TaiItem::single(HandPattern::HeavenlyTing)),
        Some(ListenKind::Earthly) => items.push(TaiItem::single(HandPattern::EarthlyTing)),
        Some(ListenKind::Declared) => items.push(TaiItem::single(HandPattern::DeclaredTing)),
        None => {}
    }
    let exposed_all = ctx.melds.len() == 5 && ctx.melds.iter().all(|m| !m.kind.is_concealed());
    if exposed_all && ctx.hidden.len() == 1 && !ctx.self_drawn {
        items.push(TaiItem::single(HandPattern::AllExposed));
    }

    let shapes = winning_shapes(ctx.hidden, ctx.win_tile, ctx.melds.len());
    if !shapes.is_empty() {
        let waits = if ctx.win_tile.is_some() {
            waiting_tiles(ctx.hidden, ctx.melds.len())
        } else {
            Vec::new()
        };
        if waits.len() == 1 {
            items.push(TaiItem::single(HandPattern::UniqueWait));
        }
        let best = shapes
            .iter()
            .map(|shape| shape_items(ctx, shape, &counts, waits.len()))
            .max_by_key(|found| found.iter().map(|i| i.tai).sum::<Tai>())
            .unwrap_or_default();
        items.extend(best);
    }

    let dealer: Tai = if ctx.is_dealer {
        items.insert(0, TaiItem::single(HandPattern::Dealer));
        HandPattern::Dealer.base_tai()
    } else {
        0
    };
    let rest: Tai = items
        .iter()
        .filter(|i| i.pattern != HandPattern::Dealer)
        .map(|i| i.tai)
        .sum();
    ScoreSheet {
        total: cap.apply(rest) + dealer,
        items,
    }
}

fn win_items(ctx: &WinContext<'_>, items: &mut Vec<TaiItem>) {
    if ctx.heavenly_win {
        items.push(TaiItem::single(HandPattern::HeavenlyWin));
        return;
    }
    if ctx.earthly_win {
        items.push(TaiItem::single(HandPattern::EarthlyWin));
        return;
    }
    let concealed = ctx.melds.iter().all(|m| m.kind.is_concealed());
    match (concealed, ctx.self_drawn) {
        (true, true) => items.push(TaiItem::single(HandPattern::ConcealedSelfDrawn)),
        (true, false) => items.push(TaiItem::single(HandPattern::Concealed)),
        (false, true) => items.push(TaiItem::single(HandPattern::SelfDrawn)),
        (false, false) => {}
    }
}

fn wind_items(ctx: &WinContext<'_>, counts: &TileCounts, items: &mut Vec<TaiItem>) {
    let sets = Wind::ALL
        .iter()
        .filter(|w| counts.get(w.tile()) >= 3)
        .count();
    let pairs = Wind::ALL
        .iter()
        .filter(|w| counts.get(w.tile()) == 2)
        .count();
    if sets == 4 {
        items.push(TaiItem::single(HandPattern::BigFourWinds));
        return;
    }
    if sets == 3 && pairs == 1 {
        items.push(TaiItem::single(HandPattern::SmallFourWinds));
        return;
    }
    if counts.get(ctx.seat_wind.tile()) >= 3 {
        items.push(TaiItem::single(HandPattern::SeatWind));
    }
    if counts.get(ctx.round_wind.tile()) >= 3 {
        items.push(TaiItem::single(HandPattern::RoundWind));
    }
}

fn dragon_items(counts: &TileCounts, items: &mut Vec<TaiItem>) {
    let sets = Dragon::ALL
        .iter()
        .filter(|d| counts.get(d.tile()) >= 3)
        .count();
    let pairs = Dragon::ALL
        .iter()
        .filter(|d| counts.get(d.tile()) == 2)
        .count();
    match (sets, pairs) {
        (3, _) => items.push(TaiItem::single(HandPattern::BigThreeDragons)),
        (2, 1) => items.push(TaiItem::single(HandPattern::SmallThreeDragons)),
        (0, _) => {}
        (n, _) => items.push(TaiItem::times(HandPattern::DragonTriplets, n)),
    }
}

fn flower_items(ctx: &WinContext<'_>, items: &mut Vec<TaiItem>) {
    if ctx.flowers.len() == NUM_FLOWERS {
        items.push(TaiItem::single(HandPattern::EightFlowers));
        return;
    }
    let own = ctx
        .flowers
        .iter()
        .filter(|f| f.flower_wind() == Some(ctx.seat_wind))
        .count()
        .min(2);
    if own > 0 {
        items.push(TaiItem::times(HandPattern::SeatFlower, own));
    }
    let seasons = ctx.flowers.iter().filter(|f| f.is_season()).count();
    let plants = ctx.flowers.len() - seasons;
    let sets = usize::from(seasons == 4) + usize::from(plants == 4);
    if sets > 0 {
        items.push(TaiItem::times(HandPattern::FlowerSet, sets));
    }
}

fn suit_items(counts: &TileCounts, items: &mut Vec<TaiItem>) {
    let mut suits: Vec<Suit> = counts
        .iter()
        .map(|(t, _)| t.suit())
        .filter(|s| s.is_numbered())
        .collect();
    suits.dedup();
    let honors = counts.iter().any(|(t, _)| t.is_honor());
    match (suits.len(), honors) {
        (0, true) => items.push(TaiItem::single(HandPattern::AllHonors)),
        (1, false) => items.push(TaiItem::single(HandPattern::PureOneSuit)),
        (1, true) => items.push(TaiItem::single(HandPattern::MixedOneSuit)),
        _ => {}
    }
}

fn run_contains(low: Tile, tile: Tile) -> bool {
    low.suit() == tile.suit() && (low.rank()..low.rank() + 3).contains(&tile.rank())
}

fn concealed_triplets(ctx: &WinContext<'_>, d: &Decomposition) -> usize {
    // On a discard win the triplet finished by the claimed tile is exposed,
    // unless that tile also fits the pair or a run of the same reading.
    let win_elsewhere = ctx
        .win_tile
        .map(|w| d.pair == w || d.runs().any(|low| run_contains(low, w)))
        .unwrap_or(true);
    let in_hand = d
        .triplets()
        .filter(|&t| ctx.self_drawn || win_elsewhere || Some(t) != ctx.win_tile)
        .count();
    in_hand
        + ctx
            .melds
            .iter()
            .filter(|m| m.kind == MeldKind::ConcealedKong)
            .count()
}

fn shape_items(
    ctx: &WinContext<'_>,
    shape: &WinShape,
    counts: &TileCounts,
    waits: usize,
) -> Vec<TaiItem> {
    let d = match shape {
        WinShape::PairsWithTriplet { .. } => {
            return vec![TaiItem::single(HandPattern::PairsWithTriplet)];
        }
        WinShape::Standard(d) => d,
    };
    let mut items = Vec::new();
    match concealed_triplets(ctx, d) {
        n if n >= 5 => items.push(TaiItem::single(HandPattern::FiveConcealedTriplets)),
        4 => items.push(TaiItem::single(HandPattern::FourConcealedTriplets)),
        3 => items.push(TaiItem::single(HandPattern::ThreeConcealedTriplets)),
        _ => {}
    }
    if d.runs().next().is_none() && ctx.melds.iter().all(Meld::is_triplet_like) {
        items.push(TaiItem::single(HandPattern::AllTriplets));
    }
    let no_honors = counts.iter().all(|(t, _)| t.is_numbered());
    if d.triplets().next().is_none()
        && ctx.melds.iter().all(|m| m.kind == MeldKind::Chi)
        && no_honors
        && ctx.flowers.is_empty()
        && !ctx.self_drawn
        && waits >= 2
    {
        items.push(TaiItem::single(HandPattern::AllChows));
    }
    items
}

/// Point transfer for one win. Scores always sum to zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub winner: SeatId,
    /// `None` for a self-drawn win.
    pub discarder: Option<SeatId>,
    pub amount: Points,
    pub deltas: [Points; NUM_SEATS],
}

pub fn settle(
    winner: SeatId,
    discarder: Option<SeatId>,
    total_tai: Tai,
    base_points: Points,
    scoring_unit: Points,
) -> Settlement {
    let amount = base_points + Points::from(total_tai) * scoring_unit;
    let mut deltas = [0; NUM_SEATS];
    match discarder {
        Some(payer) => {
            deltas[payer as usize] -= amount;
            deltas[winner as usize] += amount;
        }
        None => {
            for (seat, delta) in deltas.iter_mut().enumerate() {
                if seat != winner as usize {
                    *delta -= amount;
                }
            }
            deltas[winner as usize] += amount * (NUM_SEATS as Points - 1);
        }
    }
    Settlement {
        winner,
        discarder,
        amount,
        deltas,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::test_utils::{tile, tiles};

    fn ctx<'a>(hidden: &'a [Tile], win: &str, melds: &'a [Meld]) -> WinContext<'a> {
        WinContext {
            hidden,
            win_tile: Some(tile(win)),
            melds,
            flowers: &[],
            seat_wind: Wind::South,
            round_wind: Wind::East,
            is_dealer: false,
            self_drawn: false,
            last_tile: false,
            robbed_kong: false,
            after_kong: false,
            listen: None,
            heavenly_win: false,
            earthly_win: false,
        }
    }

    #[test]
    fn dealer_with_a_green_dragon_triplet() {
        let hidden = tiles("發 發 一萬 二萬 三萬 四萬 五萬 六萬 七萬 八萬 九萬 一筒 二筒 三筒 四筒 五筒");
        let mut c = ctx(&hidden, "發", &[]);
        c.is_dealer = true;
        let sheet = calculate_tai(&c, PointCap::Unlimited);
        assert!(sheet.labels().contains(&"三元台(1)".to_string()));
        assert!(sheet.has(HandPattern::Dealer));
    }

    #[test]
    fn self_drawn_concealed_merges_into_one_item() {
        let hidden = tiles("一萬 二萬 三萬 四萬 五萬 六萬 七萬 八萬 九萬 一筒 一筒 一筒 東 東 中 中");
        let mut c = ctx(&hidden, "中", &[]);
        c.self_drawn = true;
        let sheet = calculate_tai(&c, PointCap::Unlimited);
        assert!(sheet.has(HandPattern::ConcealedSelfDrawn));
        assert!(!sheet.has(HandPattern::SelfDrawn));
        assert!(!sheet.has(HandPattern::Concealed));
        // 中 triplet plus the self-drawn concealed bonus.
        assert!(sheet.has(HandPattern::DragonTriplets));
        assert_eq!(sheet.total, 3 + 1);
    }

    #[test]
    fn big_three_dragons_replaces_the_per_triplet_bonus() {
        let hidden = tiles("中 中 中 發 發 發 白 白 白 一萬 二萬 三萬 五筒 五筒 七條 八條");
        let sheet = calculate_tai(&ctx(&hidden, "九條", &[]), PointCap::Unlimited);
        assert!(sheet.has(HandPattern::BigThreeDragons));
        assert!(!sheet.has(HandPattern::DragonTriplets));
    }

    #[test]
    fn pure_suit_and_all_triplets() {
        let hidden = tiles("一萬 一萬 一萬 三萬 三萬 三萬 五萬 五萬 五萬 六萬 六萬 六萬 九萬");
        let melds = [Meld::new(MeldKind::Pong, tiles("二萬 二萬 二萬"), 0)];
        let sheet = calculate_tai(&ctx(&hidden, "九萬", &melds), PointCap::Unlimited);
        assert!(sheet.has(HandPattern::PureOneSuit));
        assert!(sheet.has(HandPattern::AllTriplets));
        assert!(sheet.has(HandPattern::FourConcealedTriplets));
        assert!(sheet.has(HandPattern::UniqueWait));
    }

    #[test]
    fn discard_completed_triplet_is_not_concealed() {
        let hidden = tiles("一萬 一萬 三萬 三萬 三萬 五萬 五萬 五萬 七筒 八筒 九筒 東 東 東 北 北");
        // Winning on 一萬 makes 一萬 a triplet with 北 as the pair.
        let sheet = calculate_tai(&ctx(&hidden, "一萬", &[]), PointCap::Unlimited);
        assert!(sheet.has(HandPattern::ThreeConcealedTriplets));
        assert!(!sheet.has(HandPattern::FourConcealedTriplets));
    }

    #[test]
    fn cap_applies_before_the_dealer_bonus() {
        let hidden = tiles("中 中 中 發 發 發 白 白 白 一萬 二萬 三萬 五筒 五筒 七條 八條");
        let mut c = ctx(&hidden, "九條", &[]);
        c.is_dealer = true;
        let sheet = calculate_tai(&c, PointCap::Limit(4));
        assert_eq!(sheet.total, 4 + 1);
    }

    #[test]
    fn all_flowers_replace_flower_items() {
        let flowers: Vec<Tile> = Tile::flowers().collect();
        let hidden = tiles("一萬 二萬 三萬 四萬 五萬 六萬 七萬 八萬 九萬 一筒 一筒 一筒 東 東 中 中");
        let mut c = ctx(&hidden, "中", &[]);
        c.flowers = &flowers;
        let sheet = calculate_tai(&c, PointCap::Unlimited);
        assert!(sheet.has(HandPattern::EightFlowers));
        assert!(!sheet.has(HandPattern::SeatFlower));
        assert!(!sheet.has(HandPattern::FlowerSet));
    }

    /// Waits on 一條 or 四條; every group is a run.
    const ALL_RUNS: &str = "一萬 二萬 三萬 四萬 五萬 六萬 二筒 三筒 四筒 六條 七條 八條 五筒 五筒 二條 三條";

    struct Case {
        name: &'static str,
        hidden: &'static str,
        win: &'static str,
        melds: Vec<Meld>,
        flowers: &'static str,
        setup: fn(&mut WinContext<'_>),
        expected: &'static [HandPattern],
        total: Tai,
    }

    impl Case {
        fn new(name: &'static str, hidden: &'static str, win: &'static str) -> Self {
            Self {
                name,
                hidden,
                win,
                melds: Vec::new(),
                flowers: "",
                setup: |_| {},
                expected: &[],
                total: 0,
            }
        }

        fn expect(mut self, expected: &'static [HandPattern], total: Tai) -> Self {
            self.expected = expected;
            self.total = total;
            self
        }
    }

    fn chi(names: &str) -> Meld {
        Meld::new(MeldKind::Chi, tiles(names), 0)
    }

    #[test]
    fn tai_table() {
        use HandPattern::*;
        let cases = vec![
            Case::new(
                "seat and round wind triplets",
                "東 東 東 南 南 南 一萬 二萬 三萬 四筒 五筒 六筒 二條 三條 九條 九條",
                "四條",
            )
            .expect(&[Concealed, SeatWind, RoundWind], 3),
            Case {
                melds: vec![Meld::new(MeldKind::Pong, tiles("五筒 五筒 五筒"), 0)],
                ..Case::new(
                    "small four winds drop the wind items",
                    "東 東 東 南 南 南 西 西 西 北 北 二萬 三萬",
                    "四萬",
                )
            }
            .expect(&[SmallFourWinds, ThreeConcealedTriplets], 8 + 2),
            Case::new(
                "big four winds on a single wait",
                "東 東 東 南 南 南 西 西 西 北 北 北 一萬 二萬 三萬 五筒",
                "五筒",
            )
            .expect(&[Concealed, BigFourWinds, UniqueWait, FourConcealedTriplets], 1 + 16 + 1 + 5),
            Case::new(
                "one suit with honors",
                "一萬 二萬 三萬 四萬 五萬 六萬 七萬 八萬 九萬 二萬 三萬 西 西 西 北 北",
                "四萬",
            )
            .expect(&[Concealed, MixedOneSuit], 1 + 4),
            Case::new(
                "all honors",
                "東 東 東 南 南 南 西 西 西 中 中 中 發 發 白 白",
                "白",
            )
            .expect(
                &[
                    Concealed,
                    SeatWind,
                    RoundWind,
                    SmallThreeDragons,
                    AllHonors,
                    FourConcealedTriplets,
                    AllTriplets,
                ],
                1 + 1 + 1 + 4 + 16 + 5 + 4,
            ),
            Case::new(
                "small three dragons",
                "中 中 中 發 發 發 白 白 一萬 二萬 三萬 四筒 五筒 七條 七條 七條",
                "六筒",
            )
            .expect(&[Concealed, SmallThreeDragons, ThreeConcealedTriplets], 1 + 4 + 2),
            Case {
                setup: |c| c.self_drawn = true,
                ..Case::new(
                    "five concealed triplets",
                    "一萬 一萬 一萬 五萬 五萬 五萬 二筒 二筒 二筒 七筒 七筒 七筒 三條 三條 三條 九條",
                    "九條",
                )
            }
            .expect(
                &[ConcealedSelfDrawn, UniqueWait, FiveConcealedTriplets, AllTriplets],
                3 + 1 + 8 + 4,
            ),
            Case::new("all runs on a two-sided wait", ALL_RUNS, "四條")
                .expect(&[Concealed, AllChows], 1 + 2),
            Case {
                melds: vec![
                    chi("一萬 二萬 三萬"),
                    chi("四筒 五筒 六筒"),
                    Meld::new(MeldKind::Pong, tiles("九條 九條 九條"), 2),
                    chi("二條 三條 四條"),
                    chi("六萬 七萬 八萬"),
                ],
                ..Case::new("everything exposed", "西", "西")
            }
            .expect(&[AllExposed, UniqueWait], 2 + 1),
            Case {
                setup: |c| {
                    c.self_drawn = true;
                    c.last_tile = true;
                },
                ..Case::new("last tile self-drawn", ALL_RUNS, "四條")
            }
            .expect(&[ConcealedSelfDrawn, LastTileSelfDrawn], 3 + 1),
            Case {
                setup: |c| c.last_tile = true,
                ..Case::new("last tile discarded", ALL_RUNS, "四條")
            }
            .expect(&[Concealed, AllChows, LastTileDiscard], 1 + 2 + 1),
            Case {
                setup: |c| c.robbed_kong = true,
                ..Case::new("robbing the kong", ALL_RUNS, "四條")
            }
            .expect(&[Concealed, AllChows, RobbingTheKong], 1 + 2 + 1),
            Case {
                setup: |c| {
                    c.self_drawn = true;
                    c.after_kong = true;
                },
                ..Case::new("win on the kong replacement", ALL_RUNS, "四條")
            }
            .expect(&[ConcealedSelfDrawn, WinOnKongReplacement], 3 + 1),
            Case {
                setup: |c| {
                    c.self_drawn = true;
                    c.earthly_win = true;
                },
                ..Case::new("earthly win", ALL_RUNS, "四條")
            }
            .expect(&[EarthlyWin], 16),
            Case {
                setup: |c| {
                    c.self_drawn = true;
                    c.is_dealer = true;
                    c.heavenly_win = true;
                },
                ..Case::new("heavenly win", ALL_RUNS, "四條")
            }
            .expect(&[Dealer, HeavenlyWin], 24 + 1),
            Case {
                flowers: "夏 蘭 春",
                ..Case::new("seat flowers count at most twice", ALL_RUNS, "四條")
            }
            .expect(&[Concealed, SeatFlower], 1 + 2),
            Case {
                flowers: "春 夏 秋 冬",
                ..Case::new("complete season set", ALL_RUNS, "四條")
            }
            .expect(&[Concealed, SeatFlower, FlowerSet], 1 + 1 + 2),
            Case {
                setup: |c| c.listen = Some(ListenKind::Declared),
                ..Case::new("declared listen", ALL_RUNS, "四條")
            }
            .expect(&[Concealed, AllChows, DeclaredTing], 1 + 2 + 1),
            Case {
                setup: |c| c.listen = Some(ListenKind::Earthly),
                ..Case::new("earthly listen", ALL_RUNS, "四條")
            }
            .expect(&[Concealed, AllChows, EarthlyTing], 1 + 2 + 4),
            Case {
                setup: |c| c.listen = Some(ListenKind::Heavenly),
                ..Case::new("heavenly listen", ALL_RUNS, "四條")
            }
            .expect(&[Concealed, AllChows, HeavenlyTing], 1 + 2 + 8),
        ];

        for case in cases {
            let hidden = tiles(case.hidden);
            let flowers = tiles(case.flowers);
            let mut c = ctx(&hidden, case.win, &case.melds);
            c.flowers = &flowers;
            (case.setup)(&mut c);
            let sheet = calculate_tai(&c, PointCap::Unlimited);
            let found: HashSet<HandPattern> = sheet.items.iter().map(|i| i.pattern).collect();
            let expected: HashSet<HandPattern> = case.expected.iter().copied().collect();
            assert_eq!(found, expected, "{}: {:?}", case.name, sheet.labels());
            assert_eq!(sheet.total, case.total, "{}: {:?}", case.name, sheet.labels());
        }
    }

    #[test]
    fn settlement_is_zero_sum() {
        let discard = settle(2, Some(0), 3, 100, 20);
        assert_eq!(discard.amount, 160);
        assert_eq!(discard.deltas, [-160, 0, 160, 0]);

        let self_drawn = settle(1, None, 2, 50, 10);
        assert_eq!(self_drawn.deltas, [-70, 210, -70, -70]);
        assert_eq!(self_drawn.deltas.iter().sum::<Points>(), 0);
    }
}
