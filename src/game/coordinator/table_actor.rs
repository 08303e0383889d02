//! One task per table. The actor owns the table's `ProtocolAdapter` and is
//! the only code that touches it; joins, intents and timer firings are all
//! commands on one mailbox and are handled strictly in arrival order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::TableError;
use super::scheduler::{Scheduler, TimerHandle, TokioScheduler};
use crate::config::{EngineConfig, RoomSettings};
use crate::engine::tw::{PlayerId, TimerKind, TimerRequest};
use crate::protocol::{
    Delivery, IntentEnvelope, ProtocolAdapter, ProtocolEvent, TableId, TableSnapshot,
};
use crate::room::{DeductionStage, RoomStorage};
use crate::tokio_tools::spawn_named_task;

const LOG_TARGET: &str = "tw_mahjong::coordinator::table";

/// Transport collaborator. Failures are logged by the table and otherwise
/// ignored.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(
        &self,
        table: TableId,
        player: PlayerId,
        events: Vec<ProtocolEvent>,
    ) -> anyhow::Result<()>;
}

/// Drops everything.
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn deliver(&self, _: TableId, _: PlayerId, _: Vec<ProtocolEvent>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Forwards deliveries into a channel, e.g. towards socket writers.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(TableId, Delivery)>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(TableId, Delivery)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn deliver(
        &self,
        table: TableId,
        player: PlayerId,
        events: Vec<ProtocolEvent>,
    ) -> anyhow::Result<()> {
        self.tx
            .send((table, Delivery { to: player, events }))
            .map_err(|_| anyhow::anyhow!("delivery channel closed"))
    }
}

#[derive(Debug)]
pub struct LeaveReply {
    pub events: Vec<ProtocolEvent>,
    /// Nobody connected is left at the table.
    pub abandoned: bool,
}

#[derive(Debug)]
pub enum TableCommand {
    Join {
        player: PlayerId,
        reply: oneshot::Sender<Vec<ProtocolEvent>>,
    },
    Leave {
        player: PlayerId,
        reply: oneshot::Sender<LeaveReply>,
    },
    Disconnect {
        player: PlayerId,
    },
    Intent {
        player: PlayerId,
        envelope: IntentEnvelope,
        reply: oneshot::Sender<Vec<ProtocolEvent>>,
    },
    Timeout(TimerRequest),
    Snapshot {
        player: Option<PlayerId>,
        reply: oneshot::Sender<TableSnapshot>,
    },
    Shutdown,
}

/// Everything a table needs from the outside world.
#[derive(Clone)]
pub struct TableContext {
    pub cfg: EngineConfig,
    pub storage: Arc<dyn RoomStorage>,
    pub sink: Arc<dyn EventSink>,
}

/// Cloneable address of a running table.
#[derive(Clone, Debug)]
pub struct TableHandle {
    table_id: TableId,
    tx: mpsc::Sender<TableCommand>,
    stop: CancellationToken,
}

impl TableHandle {
    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> TableCommand,
    ) -> Result<T, TableError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| TableError::Closed(self.table_id))?;
        rx.await.map_err(|_| TableError::Closed(self.table_id))
    }

    pub async fn join(&self, player: PlayerId) -> Result<Vec<ProtocolEvent>, TableError> {
        self.request(|reply| TableCommand::Join { player, reply }).await
    }

    pub async fn leave(&self, player: PlayerId) -> Result<LeaveReply, TableError> {
        self.request(|reply| TableCommand::Leave { player, reply }).await
    }

    pub async fn disconnect(&self, player: PlayerId) -> Result<(), TableError> {
        self.tx
            .send(TableCommand::Disconnect { player })
            .await
            .map_err(|_| TableError::Closed(self.table_id))
    }

    pub async fn submit(
        &self,
        player: PlayerId,
        envelope: IntentEnvelope,
    ) -> Result<Vec<ProtocolEvent>, TableError> {
        self.request(|reply| TableCommand::Intent {
            player,
            envelope,
            reply,
        })
        .await
    }

    pub async fn snapshot(&self, player: Option<PlayerId>) -> Result<TableSnapshot, TableError> {
        self.request(|reply| TableCommand::Snapshot { player, reply })
            .await
    }

    /// Ask the actor to stop after the commands already queued.
    pub async fn shutdown(&self) {
        if self.tx.send(TableCommand::Shutdown).await.is_err() {
            self.stop.cancel();
        }
    }

    /// Stop immediately, dropping queued commands.
    pub fn abort(&self) {
        self.stop.cancel();
    }
}

pub struct TableActor {
    adapter: ProtocolAdapter,
    ctx: TableContext,
    rx: mpsc::Receiver<TableCommand>,
    scheduler: Arc<dyn Scheduler>,
    timers: HashMap<(TimerKind, u64), TimerHandle>,
    stop: CancellationToken,
}

/// Start a table task. `stop` is usually a child of the registry's token.
pub fn spawn_table(
    table_id: TableId,
    ctx: TableContext,
    stop: CancellationToken,
) -> Result<(TableHandle, JoinHandle<()>), TableError> {
    let (tx, rx) = mpsc::channel(ctx.cfg.command_capacity.max(1));
    let scheduler = Arc::new(TokioScheduler::new(tx.downgrade()));
    let actor = TableActor::new(table_id, ctx, rx, scheduler, stop.clone());
    let task = spawn_named_task(format!("table-{table_id}"), actor.run())?;
    let handle = TableHandle {
        table_id,
        tx,
        stop,
    };
    Ok((handle, task))
}

impl TableActor {
    pub fn new(
        table_id: TableId,
        ctx: TableContext,
        rx: mpsc::Receiver<TableCommand>,
        scheduler: Arc<dyn Scheduler>,
        stop: CancellationToken,
    ) -> Self {
        // Placeholder until the first round loads the stored settings.
        let adapter = ProtocolAdapter::new(table_id, RoomSettings::default(), &ctx.cfg);
        Self {
            adapter,
            ctx,
            rx,
            scheduler,
            timers: HashMap::new(),
            stop,
        }
    }

    pub async fn run(mut self) {
        let table = self.adapter.table_id();
        info!(target: LOG_TARGET, %table, "table started");
        loop {
            let command = tokio::select! {
                _ = self.stop.cancelled() => break,
                command = self.rx.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };
            if !self.handle(command).await {
                break;
            }
            self.flush().await;
            self.reconcile_timers();
        }
        self.timers.clear();
        info!(target: LOG_TARGET, %table, "table stopped");
    }

    /// Returns `false` once the actor should stop.
    async fn handle(&mut self, command: TableCommand) -> bool {
        let rounds_before = self.adapter.controller().history().len();
        match command {
            TableCommand::Join { player, reply } => {
                let events = self.adapter.join(player);
                let _ = reply.send(events);
                if self.adapter.ready_to_start() {
                    self.start_round().await;
                }
            }
            TableCommand::Leave { player, reply } => {
                let events = self.adapter.leave(player);
                let _ = reply.send(LeaveReply {
                    events,
                    abandoned: self.adapter.is_abandoned(),
                });
            }
            TableCommand::Disconnect { player } => self.adapter.disconnect(player),
            TableCommand::Intent {
                player,
                envelope,
                reply,
            } => {
                let events = self.adapter.apply_intent(player, envelope);
                let _ = reply.send(events);
            }
            TableCommand::Timeout(timer) => {
                self.timers.remove(&(timer.kind, timer.token));
                if timer.kind == TimerKind::NextRound {
                    if self.adapter.next_round_due(timer.token) {
                        self.start_round().await;
                    }
                } else {
                    debug!(target: LOG_TARGET, kind = ?timer.kind, token = timer.token, "timeout");
                    self.adapter.on_timeout(timer);
                }
            }
            TableCommand::Snapshot { player, reply } => {
                let seat = player.and_then(|p| self.adapter.seat_of(p));
                let _ = reply.send(self.adapter.snapshot(seat));
            }
            TableCommand::Shutdown => return false,
        }
        if self.adapter.controller().history().len() > rounds_before {
            self.round_finished().await;
        }
        true
    }

    async fn start_round(&mut self) {
        let table = self.adapter.table_id();
        let settings = match self.ctx.storage.load_settings(table).await {
            Ok(settings) => settings,
            Err(err) => {
                warn!(target: LOG_TARGET, %table, error = %err, "failed to load room settings; keeping previous");
                self.adapter.controller().settings().clone()
            }
        };
        let round = self.adapter.controller().round() + 1;
        self.deduct(DeductionStage::RoundStart { round }, &settings)
            .await;
        self.adapter.start_round(settings);
    }

    async fn round_finished(&mut self) {
        let controller = self.adapter.controller();
        let stage = DeductionStage::RoundEnd {
            round: controller.round(),
            is_last_round: controller.is_finished(),
        };
        let settings = controller.settings().clone();
        self.deduct(stage, &settings).await;
    }

    async fn deduct(&self, stage: DeductionStage, settings: &RoomSettings) {
        let table = self.adapter.table_id();
        let players = self.adapter.players();
        if let Err(err) = self
            .ctx
            .storage
            .deduct_cards(table, stage, &players, settings)
            .await
        {
            warn!(target: LOG_TARGET, %table, ?stage, error = %err, "card deduction failed");
        }
    }

    async fn flush(&mut self) {
        let table = self.adapter.table_id();
        for delivery in self.adapter.take_outbox() {
            let player = delivery.to;
            if let Err(err) = self.ctx.sink.deliver(table, player, delivery.events).await {
                warn!(target: LOG_TARGET, %table, player, error = %err, "event delivery failed");
            }
        }
    }

    /// Keep exactly the timers the current state asks for.
    fn reconcile_timers(&mut self) {
        let wanted = self.adapter.active_timers();
        self.timers.retain(|(kind, token), handle| {
            !handle.is_cancelled() && wanted.iter().any(|t| t.kind == *kind && t.token == *token)
        });
        for timer in wanted {
            let scheduler = &self.scheduler;
            let after = self.ctx.cfg.timeout_for(timer.kind);
            self.timers
                .entry((timer.kind, timer.token))
                .or_insert_with(|| scheduler.schedule(after, timer));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine::tw::GamePhase;
    use crate::room::InMemoryRoomStorage;
    use uuid::Uuid;

    fn context(storage: InMemoryRoomStorage, sink: Arc<dyn EventSink>) -> TableContext {
        TableContext {
            cfg: EngineConfig {
                rng_seed: Some(21),
                ..EngineConfig::default()
            },
            storage: Arc::new(storage),
            sink,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fourth_join_deals_and_charges_the_host() {
        let table = Uuid::new_v4();
        let storage = InMemoryRoomStorage::default();
        storage.set_balance(1, 3);
        let (sink, mut deliveries) = ChannelSink::new();
        let (handle, _task) =
            spawn_table(table, context(storage.clone(), Arc::new(sink)), CancellationToken::new())
                .unwrap();

        for player in 1..=4 {
            let reply = handle.join(player).await.unwrap();
            assert!(matches!(reply[0], ProtocolEvent::PlayerJoined { .. }));
        }
        let snap = handle.snapshot(Some(1)).await.unwrap();
        assert_eq!(snap.phase, GamePhase::Playing);
        assert_eq!(snap.round, 1);
        assert_eq!(storage.balance(1), Some(2));

        let mut dealt = Vec::new();
        while let Ok((id, delivery)) = deliveries.try_recv() {
            assert_eq!(id, table);
            if delivery
                .events
                .iter()
                .any(|e| matches!(e, ProtocolEvent::HandSync { .. }))
            {
                dealt.push(delivery.to);
            }
        }
        dealt.sort_unstable();
        assert_eq!(dealt, vec![1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_turns_are_played_by_the_timer() {
        let (handle, _task) = spawn_table(
            Uuid::new_v4(),
            context(InMemoryRoomStorage::default(), Arc::new(NullSink)),
            CancellationToken::new(),
        )
        .unwrap();
        for player in 1..=4 {
            handle.join(player).await.unwrap();
        }
        let before = handle.snapshot(None).await.unwrap();
        assert!(before.seats.iter().all(|s| s.discards.is_empty()));

        tokio::time::sleep(Duration::from_secs(31)).await;
        let after = handle.snapshot(None).await.unwrap();
        assert_eq!(after.seats[after.dealer as usize].discards.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_the_handle() {
        let (handle, task) = spawn_table(
            Uuid::new_v4(),
            context(InMemoryRoomStorage::default(), Arc::new(NullSink)),
            CancellationToken::new(),
        )
        .unwrap();
        handle.join(1).await.unwrap();
        handle.shutdown().await;
        task.await.unwrap();
        assert!(matches!(handle.join(2).await, Err(TableError::Closed(_))));
    }
}
