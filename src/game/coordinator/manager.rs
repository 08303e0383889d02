use anyhow::{anyhow, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::error::TableError;
use super::table_actor::{spawn_table, TableContext, TableHandle};
use crate::engine::tw::PlayerId;
use crate::protocol::{IntentEnvelope, ProtocolEvent, TableId, TableSnapshot};

const LOG_TARGET: &str = "tw_mahjong::coordinator";

struct TableEntry {
    handle: TableHandle,
    task: JoinHandle<()>,
}

/// Supervisor owning every running table. Tables are created by the first
/// join and torn down when the last connected player leaves.
pub struct TableRegistry {
    ctx: TableContext,
    tables: DashMap<TableId, TableEntry>,
    stop: CancellationToken,
}

impl TableRegistry {
    pub fn new(ctx: TableContext) -> Self {
        Self {
            ctx,
            tables: DashMap::new(),
            stop: CancellationToken::new(),
        }
    }

    pub fn table(&self, table: TableId) -> Option<TableHandle> {
        self.tables.get(&table).map(|entry| entry.handle.clone())
    }

    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn require(&self, table: TableId) -> Result<TableHandle, TableError> {
        self.table(table).ok_or(TableError::NotFound(table))
    }

    async fn open(&self, table: TableId) -> Result<TableHandle, TableError> {
        if let Some(handle) = self.table(table) {
            if !handle.is_closed() {
                return Ok(handle);
            }
            self.tables.remove(&table);
        }
        // Unknown rooms are refused before a task is spawned for them.
        self.ctx.storage.load_settings(table).await?;
        match self.tables.entry(table) {
            Entry::Occupied(entry) => Ok(entry.get().handle.clone()),
            Entry::Vacant(slot) => {
                info!(target: LOG_TARGET, %table, "opening table");
                let (handle, task) =
                    spawn_table(table, self.ctx.clone(), self.stop.child_token())?;
                slot.insert(TableEntry {
                    handle: handle.clone(),
                    task,
                });
                Ok(handle)
            }
        }
    }

    pub async fn join(
        &self,
        table: TableId,
        player: PlayerId,
    ) -> Result<Vec<ProtocolEvent>, TableError> {
        let handle = self.open(table).await?;
        handle.join(player).await
    }

    pub async fn leave(
        &self,
        table: TableId,
        player: PlayerId,
    ) -> Result<Vec<ProtocolEvent>, TableError> {
        let reply = self.require(table)?.leave(player).await?;
        if reply.abandoned {
            self.close(table).await;
        }
        Ok(reply.events)
    }

    pub async fn disconnect(&self, table: TableId, player: PlayerId) -> Result<(), TableError> {
        self.require(table)?.disconnect(player).await
    }

    pub async fn submit(
        &self,
        table: TableId,
        player: PlayerId,
        envelope: IntentEnvelope,
    ) -> Result<Vec<ProtocolEvent>, TableError> {
        self.require(table)?.submit(player, envelope).await
    }

    pub async fn snapshot(
        &self,
        table: TableId,
        player: Option<PlayerId>,
    ) -> Result<TableSnapshot, TableError> {
        self.require(table)?.snapshot(player).await
    }

    /// Stop one table and wait for its task.
    pub async fn close(&self, table: TableId) {
        let Some((_, entry)) = self.tables.remove(&table) else {
            return;
        };
        info!(target: LOG_TARGET, %table, "closing table");
        entry.handle.shutdown().await;
        if let Err(err) = entry.task.await {
            warn!(target: LOG_TARGET, %table, error = %err, "table task did not exit cleanly");
        }
    }

    /// Waits for a Ctrl+C signal and then shuts every table down.
    pub async fn shutdown_on_ctrl_c(self) -> Result<()> {
        let ctrl_c_result = signal::ctrl_c().await;
        match &ctrl_c_result {
            Ok(()) => info!(target: LOG_TARGET, "Ctrl+C received; shutting down tables"),
            Err(err) => warn!(
                target: LOG_TARGET,
                error = ?err,
                "failed to listen for Ctrl+C; shutting down tables anyway"
            ),
        }
        self.shutdown().await;
        ctrl_c_result.map_err(|err| anyhow!("failed to listen for ctrl+c: {err}"))
    }

    pub async fn shutdown(self) {
        self.stop.cancel();
        let tasks: Vec<_> = self
            .table_ids()
            .into_iter()
            .filter_map(|table| self.tables.remove(&table))
            .map(|(table, entry)| async move { (table, entry.task.await) })
            .collect();
        for (table, result) in join_all(tasks).await {
            if let Err(err) = result {
                warn!(target: LOG_TARGET, %table, error = %err, "table task did not exit cleanly");
            }
        }
    }
}

impl Drop for TableRegistry {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::EngineConfig;
    use crate::game::coordinator::table_actor::NullSink;
    use crate::room::{InMemoryRoomStorage, RoomError};
    use uuid::Uuid;

    fn registry(storage: InMemoryRoomStorage) -> TableRegistry {
        TableRegistry::new(TableContext {
            cfg: EngineConfig::default(),
            storage: Arc::new(storage),
            sink: Arc::new(NullSink),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn first_join_opens_and_last_leave_closes() {
        let registry = registry(InMemoryRoomStorage::default());
        let table = Uuid::new_v4();
        assert!(matches!(
            registry.submit(table, 1, IntentEnvelope::new(1, crate::protocol::Intent::Draw)).await,
            Err(TableError::NotFound(_))
        ));

        registry.join(table, 1).await.unwrap();
        registry.join(table, 2).await.unwrap();
        assert_eq!(registry.table_ids(), vec![table]);

        registry.leave(table, 1).await.unwrap();
        assert_eq!(registry.len(), 1);
        let events = registry.leave(table, 2).await.unwrap();
        assert!(matches!(events[0], ProtocolEvent::PlayerLeft { kept_seat: false, .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_rooms_are_refused() {
        let registry = registry(InMemoryRoomStorage::strict());
        let table = Uuid::new_v4();
        assert!(matches!(
            registry.join(table, 1).await,
            Err(TableError::Room(RoomError::NotFound(id))) if id == table
        ));
        assert!(registry.is_empty());
    }
}
