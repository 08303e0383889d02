use serde::{Deserialize, Serialize};

use crate::engine::tw::{ClaimChoice, PlayerAction, Tile};

/// One intent as sent by a client. `client_seq` increases per player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentEnvelope {
    pub client_seq: u64,
    #[serde(flatten)]
    pub intent: Intent,
}

impl IntentEnvelope {
    pub fn new(client_seq: u64, intent: Intent) -> Self {
        Self { client_seq, intent }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    Chi,
    Pong,
    Kong,
    Hu,
    Pass,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Intent {
    #[serde(rename = "DISCARD_INTENT")]
    Discard { tile: Tile },
    #[serde(rename = "CLAIM_INTENT")]
    Claim {
        claim: ClaimType,
        /// Only read for chi.
        #[serde(default)]
        tiles: Vec<Tile>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window: Option<u64>,
    },
    #[serde(rename = "DRAW_INTENT")]
    Draw,
    #[serde(rename = "SELF_KONG_INTENT")]
    SelfKong { tile: Tile },
    #[serde(rename = "TING_INTENT")]
    Ting { declare: bool },
}

impl Intent {
    pub fn into_action(self) -> PlayerAction {
        match self {
            Intent::Discard { tile } => PlayerAction::Discard { tile },
            Intent::Draw => PlayerAction::Draw,
            Intent::SelfKong { tile } => PlayerAction::SelfKong { tile },
            Intent::Ting { declare } => PlayerAction::Ting { declare },
            Intent::Claim {
                claim,
                tiles,
                window,
            } => {
                let choice = match claim {
                    ClaimType::Chi => ClaimChoice::Chi { tiles },
                    ClaimType::Pong => ClaimChoice::Pong,
                    ClaimType::Kong => ClaimChoice::Kong,
                    ClaimType::Hu => ClaimChoice::Hu,
                    ClaimType::Pass => ClaimChoice::Pass,
                };
                PlayerAction::Claim { choice, window }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::serde::assert_round_trip_eq;
    use crate::test_utils::{tile, tiles};

    #[test]
    fn parses_the_wire_envelope() {
        let raw = format!(
            r#"{{"clientSeq":7,"type":"DISCARD_INTENT","tile":{}}}"#,
            tile("九萬").id()
        );
        let envelope: IntentEnvelope = serde_json::from_str(&raw).unwrap();
        assert_eq!(envelope.client_seq, 7);
        assert_eq!(
            envelope.intent.into_action(),
            PlayerAction::Discard { tile: tile("九萬") }
        );
    }

    #[test]
    fn unknown_tile_ids_are_refused_when_decoding() {
        for raw in [
            r#"{"clientSeq":1,"type":"DISCARD_INTENT","tile":200}"#,
            r#"{"clientSeq":1,"type":"SELF_KONG_INTENT","tile":42}"#,
            r#"{"clientSeq":1,"type":"CLAIM_INTENT","claim":"chi","tiles":[1,2,99]}"#,
        ] {
            assert!(serde_json::from_str::<IntentEnvelope>(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn claim_intent_defaults_tiles_and_window() {
        let envelope: IntentEnvelope =
            serde_json::from_str(r#"{"clientSeq":1,"type":"CLAIM_INTENT","claim":"pong"}"#).unwrap();
        assert_eq!(
            envelope.intent.into_action(),
            PlayerAction::Claim {
                choice: ClaimChoice::Pong,
                window: None
            }
        );
    }

    #[test]
    fn chi_keeps_its_tiles() {
        let intent = Intent::Claim {
            claim: ClaimType::Chi,
            tiles: tiles("二萬 三萬 四萬"),
            window: Some(3),
        };
        assert_round_trip_eq(&IntentEnvelope::new(2, intent.clone()));
        assert_eq!(
            intent.into_action(),
            PlayerAction::Claim {
                choice: ClaimChoice::Chi {
                    tiles: tiles("二萬 三萬 四萬")
                },
                window: Some(3)
            }
        );
    }
}
