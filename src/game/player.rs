use smallvec::SmallVec;

use crate::game::action::ActionType;
use crate::tile::{Hand, Meld, Tile, Wind};

/// 座位上的玩家身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub id: u64,
    pub display_name: String,
}

/// 一个座位的完整状态
///
/// `wind` 是开局掷骰后分到的门风（庄家为东），`seat_wind` 是按入座顺序的
/// 固定座风；两者都会出现在快照里。
#[derive(Debug, Clone)]
pub struct Player {
    pub info: PlayerInfo,
    pub hand: Hand,
    pub discards: Vec<Tile>,
    pub melds: Vec<Meld>,
    pub flowers: Vec<Tile>,
    /// 累计分数（跨局保留）
    pub score: i32,
    /// 本局分数变动
    pub score_delta: i32,
    pub is_dealer: bool,
    pub is_riichi: bool,
    /// 立直后第一张弃牌在弃牌堆中的序号，未立直为 -1
    pub riichi_discard_index: i32,
    pub is_winner: bool,
    pub is_loser: bool,
    pub tai_count: u32,
    pub wind: Wind,
    pub seat_wind: Wind,
    /// 等待该座位响应的动作集合（空表示无事可做）
    pub available_actions: SmallVec<[ActionType; 4]>,
    /// 响应窗口内登记的最终选择（`None` 表示尚未表态）
    pub claim_decision: Option<ActionType>,
}

impl Player {
    pub fn new(info: PlayerInfo, seat_wind: Wind, is_dealer: bool) -> Self {
        Self {
            info,
            hand: Hand::new(),
            discards: Vec::new(),
            melds: Vec::new(),
            flowers: Vec::new(),
            score: 0,
            score_delta: 0,
            is_dealer,
            is_riichi: false,
            riichi_discard_index: -1,
            is_winner: false,
            is_loser: false,
            tai_count: 0,
            wind: seat_wind,
            seat_wind,
            available_actions: SmallVec::new(),
            claim_decision: None,
        }
    }

    /// 是否还没对当前弃牌表态
    pub fn is_undecided(&self) -> bool {
        !self.available_actions.is_empty() && self.claim_decision.is_none()
    }

    /// 清掉响应窗口的全部痕迹
    pub fn clear_pending(&mut self) {
        self.available_actions.clear();
        self.claim_decision = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player_defaults() {
        let p = Player::new(
            PlayerInfo {
                id: 7,
                display_name: "測試".into(),
            },
            Wind::South,
            false,
        );
        assert_eq!(p.riichi_discard_index, -1);
        assert_eq!(p.wind, Wind::South);
        assert!(!p.is_undecided());
    }

    #[test]
    fn test_undecided_tracking() {
        let mut p = Player::new(
            PlayerInfo {
                id: 1,
                display_name: "a".into(),
            },
            Wind::East,
            true,
        );
        p.available_actions.push(ActionType::Pong);
        assert!(p.is_undecided());

        p.claim_decision = Some(ActionType::Pass);
        assert!(!p.is_undecided());

        p.clear_pending();
        assert!(p.available_actions.is_empty());
        assert!(p.claim_decision.is_none());
    }
}
