use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tw_mahjong::config::{DeductionMode, EngineConfig, PointCap, RoomSettings};
use tw_mahjong::engine::tw::PlayerId;
use tw_mahjong::game::coordinator::{ChannelSink, TableContext, TableRegistry};
use tw_mahjong::protocol::{bot, IntentEnvelope, ProtocolEvent, TableId};
use tw_mahjong::room::InMemoryRoomStorage;
use tw_mahjong::telemetry::init_tracing;

const LOG_TARGET: &str = "bin::table_sim";

#[derive(Debug, Parser)]
#[command(name = "table_sim")]
#[command(about = "Run bot-driven mahjong tables end to end", long_about = None)]
struct Args {
    /// Number of tables to run in parallel
    #[arg(long, env = "SIM_TABLES", default_value_t = 1)]
    tables: usize,

    /// Rounds per match
    #[arg(long, env = "SIM_ROUNDS", default_value_t = 4)]
    rounds: u32,

    /// Maximum tai per win; unlimited when omitted
    #[arg(long, env = "SIM_POINT_CAP")]
    point_cap: Option<u32>,

    /// Seed for deterministic walls (overrides MAHJONG_RNG_SEED)
    #[arg(long)]
    seed: Option<u64>,

    /// Decision timeout in milliseconds for turns, claims and ting
    #[arg(long, env = "SIM_DECISION_TIMEOUT_MS", default_value_t = 2_000)]
    decision_timeout_ms: u64,

    /// Pause between rounds in milliseconds
    #[arg(long, env = "SIM_NEXT_ROUND_DELAY_MS", default_value_t = 100)]
    next_round_delay_ms: u64,

    /// Toggle structured (JSON) logs
    #[arg(long, env = "SIM_LOG_JSON", default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_tracing(args.json, "info")?;
    let cfg = build_config(&args).context("failed to build engine config")?;
    run(args, cfg).await
}

fn load_dotenv() {
    let manifest_env = env!("CARGO_MANIFEST_DIR");
    let manifest_env_path = PathBuf::from(manifest_env).join(".env");
    dotenv::from_filename(manifest_env_path).ok();
    dotenv::dotenv().ok();
}

fn build_config(args: &Args) -> Result<EngineConfig> {
    if args.tables == 0 {
        return Err(anyhow!("--tables must be at least 1"));
    }
    let mut cfg = EngineConfig::from_env()?;
    let decision = Duration::from_millis(args.decision_timeout_ms);
    cfg.claim_timeout = decision;
    cfg.ting_timeout = decision;
    cfg.turn_timeout = decision;
    cfg.next_round_delay = Duration::from_millis(args.next_round_delay_ms);
    if args.seed.is_some() {
        cfg.rng_seed = args.seed;
    }
    Ok(cfg)
}

/// Per-player bookkeeping for the bots.
#[derive(Default)]
struct Bots {
    seqs: HashMap<PlayerId, u64>,
    finished: HashSet<TableId>,
}

impl Bots {
    fn next_seq(&mut self, player: PlayerId) -> u64 {
        let seq = self.seqs.entry(player).or_insert(0);
        *seq += 1;
        *seq
    }

    /// Act on `events` as `player` until the table has nothing more for
    /// them to decide.
    async fn react(
        &mut self,
        registry: &TableRegistry,
        table: TableId,
        player: PlayerId,
        mut events: Vec<ProtocolEvent>,
    ) -> Result<()> {
        loop {
            if let Some(ProtocolEvent::GameEnd { final_scores, .. }) = events
                .iter()
                .find(|e| matches!(e, ProtocolEvent::GameEnd { .. }))
            {
                if self.finished.insert(table) {
                    info!(target: LOG_TARGET, %table, scores = ?final_scores, "match finished");
                    println!("{}", json!({ "table": table, "finalScores": final_scores }));
                }
            }
            if let Some(code) = events.iter().find_map(ProtocolEvent::rejection_code) {
                debug!(target: LOG_TARGET, %table, player, code, "bot intent rejected");
                return Ok(());
            }
            let Some(snapshot) = events.last().and_then(ProtocolEvent::as_snapshot) else {
                return Ok(());
            };
            let Some(intent) = bot::suggest(snapshot) else {
                return Ok(());
            };
            let envelope = IntentEnvelope::new(self.next_seq(player), intent);
            events = registry.submit(table, player, envelope).await?;
            // A bare snapshot means the intent changed nothing.
            if events.len() == 1 {
                return Ok(());
            }
        }
    }
}

async fn run(args: Args, cfg: EngineConfig) -> Result<()> {
    let settings = RoomSettings {
        rounds: args.rounds,
        point_cap: args.point_cap.map_or(PointCap::Unlimited, PointCap::Limit),
        deduction_mode: DeductionMode::SplitEvenly,
        cards_per_match: 4,
        ..RoomSettings::default()
    };
    let storage = InMemoryRoomStorage::new(settings);
    let (sink, mut deliveries) = ChannelSink::new();
    let registry = TableRegistry::new(TableContext {
        cfg,
        storage: Arc::new(storage.clone()),
        sink: Arc::new(sink),
    });

    let mut bots = Bots::default();
    let mut tables = Vec::with_capacity(args.tables);
    for index in 0..args.tables {
        let table = Uuid::new_v4();
        for seat in 0..4u64 {
            let player = index as u64 * 4 + seat + 1;
            let reply = registry.join(table, player).await?;
            bots.react(&registry, table, player, reply).await?;
        }
        tables.push(table);
    }
    info!(target: LOG_TARGET, tables = tables.len(), "tables seated");

    while bots.finished.len() < tables.len() {
        tokio::select! {
            delivery = deliveries.recv() => {
                let Some((table, delivery)) = delivery else {
                    return Err(anyhow!("delivery channel closed before every match finished"));
                };
                if let Err(err) = bots.react(&registry, table, delivery.to, delivery.events).await {
                    warn!(target: LOG_TARGET, %table, error = %err, "bot failed to act");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!(target: LOG_TARGET, "interrupted");
                break;
            }
        }
    }

    info!(
        target: LOG_TARGET,
        deductions = storage.deductions().len(),
        "simulation complete"
    );
    registry.shutdown().await;
    Ok(())
}
