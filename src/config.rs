use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::tw::types::{HandConfig, Points, Tai, TimerKind};

pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_NEXT_ROUND_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_COMMAND_CAPACITY: usize = 256;

/// Ceiling on the non-dealer tai of a single win.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tai", rename_all = "snake_case")]
pub enum PointCap {
    Limit(Tai),
    #[default]
    Unlimited,
}

impl PointCap {
    pub fn apply(self, tai: Tai) -> Tai {
        match self {
            PointCap::Limit(cap) => tai.min(cap),
            PointCap::Unlimited => tai,
        }
    }
}

/// Who pays the room cards for a match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionMode {
    #[default]
    HostPays,
    SplitEvenly,
    Free,
}

/// Room configuration as stored by the persistence collaborator. Read once at
/// the start of every round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomSettings {
    pub rounds: u32,
    pub base_points: Points,
    pub scoring_unit: Points,
    pub point_cap: PointCap,
    pub deduction_mode: DeductionMode,
    pub cards_per_match: u32,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            rounds: 4,
            base_points: 100,
            scoring_unit: 20,
            point_cap: PointCap::Unlimited,
            deduction_mode: DeductionMode::HostPays,
            cards_per_match: 1,
        }
    }
}

impl RoomSettings {
    pub fn hand_config(&self, auto_draw: bool) -> HandConfig {
        HandConfig {
            base_points: self.base_points,
            scoring_unit: self.scoring_unit,
            point_cap: self.point_cap,
            auto_draw,
        }
    }
}

/// Process-wide engine knobs. Durations serialize as whole milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    #[serde(with = "millis")]
    pub claim_timeout: Duration,
    #[serde(with = "millis")]
    pub ting_timeout: Duration,
    #[serde(with = "millis")]
    pub turn_timeout: Duration,
    #[serde(with = "millis")]
    pub next_round_delay: Duration,
    /// Start every turn with an automatic draw instead of waiting for a
    /// draw intent.
    pub auto_draw: bool,
    pub rng_seed: Option<u64>,
    pub command_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            claim_timeout: DEFAULT_DECISION_TIMEOUT,
            ting_timeout: DEFAULT_DECISION_TIMEOUT,
            turn_timeout: DEFAULT_DECISION_TIMEOUT,
            next_round_delay: DEFAULT_NEXT_ROUND_DELAY,
            auto_draw: false,
            rng_seed: None,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `MAHJONG_*` variables. A `.env` file is loaded
    /// first when present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let millis = |key: &str| -> Result<Option<Duration>> {
            lookup(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map(Duration::from_millis)
                        .with_context(|| format!("{key} must be a number of milliseconds"))
                })
                .transpose()
        };
        if let Some(v) = millis("MAHJONG_CLAIM_TIMEOUT_MS")? {
            cfg.claim_timeout = v;
        }
        if let Some(v) = millis("MAHJONG_TING_TIMEOUT_MS")? {
            cfg.ting_timeout = v;
        }
        if let Some(v) = millis("MAHJONG_TURN_TIMEOUT_MS")? {
            cfg.turn_timeout = v;
        }
        if let Some(v) = millis("MAHJONG_NEXT_ROUND_DELAY_MS")? {
            cfg.next_round_delay = v;
        }
        if let Some(raw) = lookup("MAHJONG_AUTO_DRAW") {
            cfg.auto_draw = raw
                .trim()
                .parse()
                .with_context(|| format!("MAHJONG_AUTO_DRAW must be true or false, got {raw:?}"))?;
        }
        if let Some(raw) = lookup("MAHJONG_RNG_SEED") {
            let seed = raw.trim().parse().context("MAHJONG_RNG_SEED must be a u64")?;
            cfg.rng_seed = Some(seed);
        }
        if let Some(raw) = lookup("MAHJONG_COMMAND_CAPACITY") {
            cfg.command_capacity = raw
                .trim()
                .parse()
                .context("MAHJONG_COMMAND_CAPACITY must be a positive integer")?;
        }
        Ok(cfg)
    }

    pub fn timeout_for(&self, kind: TimerKind) -> Duration {
        match kind {
            TimerKind::Turn => self.turn_timeout,
            TimerKind::Claim => self.claim_timeout,
            TimerKind::Ting => self.ting_timeout,
            TimerKind::NextRound => self.next_round_delay,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
