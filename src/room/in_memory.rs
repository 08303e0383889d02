use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::error::RoomError;
use super::storage::{card_charges, DeductionStage, RoomStorage};
use crate::config::RoomSettings;
use crate::engine::tw::PlayerId;
use crate::protocol::TableId;

/// One callback as received, with the cards actually taken.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionRecord {
    pub table: TableId,
    pub stage: DeductionStage,
    pub charges: Vec<(PlayerId, u32)>,
}

#[derive(Default)]
struct Inner {
    rooms: HashMap<TableId, RoomSettings>,
    /// Players without an entry are not metered.
    balances: HashMap<PlayerId, u32>,
    deductions: Vec<DeductionRecord>,
}

/// Room store kept in process memory. Unknown tables get `fallback`
/// settings unless `strict` is set.
#[derive(Clone)]
pub struct InMemoryRoomStorage {
    inner: Arc<RwLock<Inner>>,
    fallback: RoomSettings,
    strict: bool,
}

impl Default for InMemoryRoomStorage {
    fn default() -> Self {
        Self::new(RoomSettings::default())
    }
}

impl InMemoryRoomStorage {
    pub fn new(fallback: RoomSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            fallback,
            strict: false,
        }
    }

    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn put_room(&self, table: TableId, settings: RoomSettings) {
        self.inner.write().rooms.insert(table, settings);
    }

    pub fn set_balance(&self, player: PlayerId, cards: u32) {
        self.inner.write().balances.insert(player, cards);
    }

    pub fn balance(&self, player: PlayerId) -> Option<u32> {
        self.inner.read().balances.get(&player).copied()
    }

    pub fn deductions(&self) -> Vec<DeductionRecord> {
        self.inner.read().deductions.clone()
    }
}

#[async_trait]
impl RoomStorage for InMemoryRoomStorage {
    async fn load_settings(&self, table: TableId) -> Result<RoomSettings, RoomError> {
        match self.inner.read().rooms.get(&table) {
            Some(settings) => Ok(settings.clone()),
            None if self.strict => Err(RoomError::NotFound(table)),
            None => Ok(self.fallback.clone()),
        }
    }

    async fn deduct_cards(
        &self,
        table: TableId,
        stage: DeductionStage,
        players: &[PlayerId],
        settings: &RoomSettings,
    ) -> Result<(), RoomError> {
        let charges = card_charges(settings, stage, players);
        let mut inner = self.inner.write();
        for &(player, required) in &charges {
            if let Some(&available) = inner.balances.get(&player) {
                if available < required {
                    return Err(RoomError::InsufficientCards {
                        player,
                        available,
                        required,
                    });
                }
            }
        }
        for &(player, cards) in &charges {
            if let Some(balance) = inner.balances.get_mut(&player) {
                *balance -= cards;
            }
        }
        inner.deductions.push(DeductionRecord {
            table,
            stage,
            charges,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeductionMode;
    use uuid::Uuid;

    #[tokio::test]
    async fn unknown_rooms_fall_back_unless_strict() {
        let table = Uuid::new_v4();
        let storage = InMemoryRoomStorage::default();
        assert_eq!(
            storage.load_settings(table).await.unwrap(),
            RoomSettings::default()
        );

        let strict = InMemoryRoomStorage::strict();
        assert!(matches!(
            strict.load_settings(table).await,
            Err(RoomError::NotFound(id)) if id == table
        ));
        let custom = RoomSettings {
            rounds: 8,
            ..RoomSettings::default()
        };
        strict.put_room(table, custom.clone());
        assert_eq!(strict.load_settings(table).await.unwrap(), custom);
    }

    #[tokio::test]
    async fn deductions_are_all_or_nothing() {
        let table = Uuid::new_v4();
        let storage = InMemoryRoomStorage::default();
        let settings = RoomSettings {
            deduction_mode: DeductionMode::SplitEvenly,
            cards_per_match: 4,
            ..RoomSettings::default()
        };
        storage.set_balance(1, 5);
        storage.set_balance(4, 0);
        let start = DeductionStage::RoundStart { round: 1 };

        let err = storage
            .deduct_cards(table, start, &[1, 2, 3, 4], &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, RoomError::InsufficientCards { player: 4, .. }));
        assert_eq!(storage.balance(1), Some(5));
        assert!(storage.deductions().is_empty());

        storage.set_balance(4, 1);
        storage
            .deduct_cards(table, start, &[1, 2, 3, 4], &settings)
            .await
            .unwrap();
        assert_eq!(storage.balance(1), Some(4));
        assert_eq!(storage.balance(4), Some(0));
        assert_eq!(storage.deductions().len(), 1);
    }
}
