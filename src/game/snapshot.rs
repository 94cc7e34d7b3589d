use serde::{Deserialize, Serialize};

use crate::game::action::ActionType;
use crate::game::state::{GamePhase, WinType};
use crate::tile::{Meld, Tile, Wind};

/// 座位公开信息（快照里的 `info` 字段）
///
/// 字段名与客户端协议一一对应，立直沿用协议里的 `richii` 拼写。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfoDto {
    pub id: u64,
    pub name: String,
    pub score: i32,
    #[serde(rename = "roundScoreDelta")]
    pub round_score_delta: i32,
    #[serde(rename = "isDealer")]
    pub is_dealer: bool,
    #[serde(rename = "flowerCount")]
    pub flower_count: usize,
    pub flowers: Vec<Tile>,
    pub wind: Wind,
    #[serde(rename = "seatWind")]
    pub seat_wind: Wind,
    #[serde(rename = "isRichii")]
    pub is_riichi: bool,
    #[serde(rename = "richiiDiscardIndex")]
    pub riichi_discard_index: i32,
    #[serde(rename = "isWinner")]
    pub is_winner: bool,
    #[serde(rename = "isLoser")]
    pub is_loser: bool,
    pub tai: u32,
}

/// 座位快照：公开部分对所有人一致，`hand` 只发给本人（终局时全部揭示）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerDto {
    pub info: PlayerInfoDto,
    #[serde(rename = "handCount")]
    pub hand_count: usize,
    pub discards: Vec<Tile>,
    pub melds: Vec<Meld>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<Tile>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastDiscardDto {
    pub tile: Tile,
    #[serde(rename = "playerIndex")]
    pub player_index: usize,
}

/// 开局动画数据：掷骰与定风
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitDataDto {
    pub step: String,
    #[serde(rename = "diceValues")]
    pub dice_values: [u8; 2],
    #[serde(rename = "windAssignment")]
    pub wind_assignment: [u8; 4],
}

/// 个性化游戏快照
///
/// 每次状态迁移后对每个座位各发一份；`availableActions` 是收件人自己的
/// 待响应动作。快照可幂等替换之前的任何一份，丢帧不需要补偿。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    #[serde(rename = "deckCount")]
    pub deck_count: usize,
    pub players: Vec<PlayerDto>,
    pub turn: usize,
    pub state: GamePhase,
    #[serde(rename = "lastDiscard", default, skip_serializing_if = "Option::is_none")]
    pub last_discard: Option<LastDiscardDto>,
    #[serde(rename = "initData", default, skip_serializing_if = "Option::is_none")]
    pub init_data: Option<InitDataDto>,
    #[serde(rename = "winnerIndex", default, skip_serializing_if = "Option::is_none")]
    pub winner_index: Option<i32>,
    #[serde(rename = "winType", default, skip_serializing_if = "Option::is_none")]
    pub win_type: Option<WinType>,
    #[serde(rename = "availableActions")]
    pub available_actions: Vec<ActionType>,
}

/// 桌面演出事件（`game:effect`）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEffect {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(rename = "playerIndex")]
    pub player_index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile: Option<Tile>,
}

impl GameEffect {
    pub fn new(kind: &str, text: &str, player_index: i32) -> Self {
        Self {
            kind: kind.to_string(),
            text: text.to_string(),
            player_index,
            variant: None,
            tile: None,
        }
    }

    pub fn with_variant(mut self, variant: &str) -> Self {
        self.variant = Some(variant.to_string());
        self
    }

    pub fn with_tile(mut self, tile: Tile) -> Self {
        self.tile = Some(tile);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Suit;

    #[test]
    fn test_snapshot_wire_shape() {
        let snap = GameSnapshot {
            deck_count: 80,
            players: vec![],
            turn: 2,
            state: GamePhase::Discard,
            last_discard: Some(LastDiscardDto {
                tile: Tile::new(3, Suit::Dots, 7),
                player_index: 1,
            }),
            init_data: None,
            winner_index: None,
            win_type: None,
            available_actions: vec![ActionType::Hu, ActionType::Pong],
        };

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["deckCount"], 80);
        assert_eq!(json["state"], "STATE_DISCARD");
        assert_eq!(json["lastDiscard"]["playerIndex"], 1);
        assert_eq!(json["availableActions"][0], "HU");
        // 未终局时不携带胜负字段
        assert!(json.get("winnerIndex").is_none());

        let back: GameSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back.turn, 2);
        assert_eq!(back.available_actions.len(), 2);
    }

    #[test]
    fn test_effect_wire_shape() {
        let effect = GameEffect::new("ACTION_PONG", "碰", 2).with_tile(Tile::new(1, Suit::Bamboo, 4));
        let json = serde_json::to_value(&effect).unwrap();
        assert_eq!(json["type"], "ACTION_PONG");
        assert_eq!(json["playerIndex"], 2);
        assert_eq!(json["tile"]["suit"], "BAMBOO");
        assert!(json.get("variant").is_none());
    }
}
