use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::RoomError;
use crate::config::{DeductionMode, RoomSettings};
use crate::engine::tw::PlayerId;
use crate::protocol::TableId;

/// When a table calls back into the room store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DeductionStage {
    RoundStart { round: u32 },
    RoundEnd { round: u32, is_last_round: bool },
}

/// Persistence collaborator. Tables read their settings once per round and
/// report round boundaries; they never write game records.
#[async_trait]
pub trait RoomStorage: Send + Sync {
    async fn load_settings(&self, table: TableId) -> Result<RoomSettings, RoomError>;

    /// `players` is in seat order, the host first.
    async fn deduct_cards(
        &self,
        table: TableId,
        stage: DeductionStage,
        players: &[PlayerId],
        settings: &RoomSettings,
    ) -> Result<(), RoomError>;
}

/// Cards each player owes at `stage`. The fee is charged once, when the
/// first round starts.
pub fn card_charges(
    settings: &RoomSettings,
    stage: DeductionStage,
    players: &[PlayerId],
) -> Vec<(PlayerId, u32)> {
    if stage != (DeductionStage::RoundStart { round: 1 }) || players.is_empty() {
        return Vec::new();
    }
    let fee = settings.cards_per_match;
    match settings.deduction_mode {
        DeductionMode::Free => Vec::new(),
        DeductionMode::HostPays => vec![(players[0], fee)],
        DeductionMode::SplitEvenly => {
            let count = players.len() as u32;
            let (share, remainder) = (fee / count, fee % count);
            players
                .iter()
                .enumerate()
                .map(|(idx, &player)| (player, share + u32::from((idx as u32) < remainder)))
                .filter(|&(_, cards)| cards > 0)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(mode: DeductionMode, cards: u32) -> RoomSettings {
        RoomSettings {
            deduction_mode: mode,
            cards_per_match: cards,
            ..RoomSettings::default()
        }
    }

    #[test]
    fn host_pays_the_whole_fee_once() {
        let s = settings(DeductionMode::HostPays, 4);
        let start = DeductionStage::RoundStart { round: 1 };
        assert_eq!(card_charges(&s, start, &[7, 8, 9, 10]), vec![(7, 4)]);
        assert!(card_charges(&s, DeductionStage::RoundStart { round: 2 }, &[7, 8]).is_empty());
        let end = DeductionStage::RoundEnd {
            round: 1,
            is_last_round: true,
        };
        assert!(card_charges(&s, end, &[7, 8]).is_empty());
    }

    #[test]
    fn split_spreads_the_remainder_from_the_host() {
        let s = settings(DeductionMode::SplitEvenly, 6);
        let start = DeductionStage::RoundStart { round: 1 };
        assert_eq!(
            card_charges(&s, start, &[1, 2, 3, 4]),
            vec![(1, 2), (2, 2), (3, 1), (4, 1)]
        );
        assert!(card_charges(&settings(DeductionMode::Free, 6), start, &[1]).is_empty());
    }
}
