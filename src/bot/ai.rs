use rand::Rng;

use crate::game::action::ActionType;
use crate::tile::{Suit, Tile};

/// 机器人难度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    /// 从配置字符串解析，无法识别时回落到普通难度
    pub fn parse(s: &str) -> Self {
        match s {
            "easy" => Difficulty::Easy,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Normal,
        }
    }
}

/// 无状态的出牌 / 鸣牌策略
///
/// 输入永远是快照里自己那份手牌，和人类客户端看到的一致。
pub struct Bot {
    difficulty: Difficulty,
}

impl Bot {
    pub fn new(difficulty: Difficulty) -> Self {
        Self { difficulty }
    }

    /// 决定打出哪张（返回手牌序号）
    pub fn decide_discard(&self, hand: &[Tile]) -> Option<usize> {
        if hand.is_empty() {
            return None;
        }
        let index = match self.difficulty {
            Difficulty::Easy => rand::thread_rng().gen_range(0..hand.len()),
            Difficulty::Normal => Self::normal_discard(hand),
            Difficulty::Hard => Self::hard_discard(hand),
        };
        Some(index.min(hand.len() - 1))
    }

    /// 普通：打第一张完全孤立的牌，找不到就打最后一张（通常是刚摸的）
    fn normal_discard(hand: &[Tile]) -> usize {
        let count = |suit: Suit, value: u8| {
            hand.iter().filter(|t| t.suit == suit && t.value == value).count()
        };

        for (i, tile) in hand.iter().enumerate() {
            if count(tile.suit, tile.value) != 1 {
                continue;
            }
            if !tile.suit.is_numbered() {
                return i;
            }
            let lonely = (tile.value <= 1 || count(tile.suit, tile.value - 1) == 0)
                && count(tile.suit, tile.value + 1) == 0;
            if lonely {
                return i;
            }
        }
        hand.len() - 1
    }

    /// 困难：按“黏着度”打分，分数最低的最先打出
    ///
    /// 等值牌 −30/张，同门 ±2 以内 −15/张；孤立字牌 +20，幺九 +10。
    fn hard_discard(hand: &[Tile]) -> usize {
        let mut best_index = hand.len() - 1;
        let mut best_score = i32::MAX;

        for (i, tile) in hand.iter().enumerate() {
            let score = Self::attachment_score(hand, i, tile);
            if score < best_score {
                best_score = score;
                best_index = i;
            }
        }
        best_index
    }

    fn attachment_score(hand: &[Tile], index: usize, tile: &Tile) -> i32 {
        let mut score = 50;

        let matches = hand
            .iter()
            .enumerate()
            .filter(|(j, t)| *j != index && *t == tile)
            .count() as i32;
        score -= matches * 30;

        if tile.suit.is_numbered() {
            let adjacent = hand
                .iter()
                .enumerate()
                .filter(|(j, t)| {
                    *j != index && t.suit == tile.suit && {
                        let diff = t.value as i32 - tile.value as i32;
                        diff != 0 && (-2..=2).contains(&diff)
                    }
                })
                .count() as i32;
            score -= adjacent * 15;

            if tile.value == 1 || tile.value == 9 {
                score += 10;
            }
        } else if matches == 0 {
            // 孤立字牌最不值得留
            score += 20;
        }

        score
    }

    /// 是否响应一张弃牌
    pub fn should_claim(&self, action: ActionType, hand: &[Tile], discard: &Tile) -> bool {
        let mut rng = rand::thread_rng();
        match self.difficulty {
            Difficulty::Easy => rng.gen::<f32>() < 0.2,
            Difficulty::Normal => rng.gen::<f32>() < 0.4,
            Difficulty::Hard => match action {
                ActionType::Hu => true,
                ActionType::Kong => rng.gen::<f32>() < 0.7,
                ActionType::Pong => {
                    let copies = hand.iter().filter(|t| *t == discard).count();
                    copies >= 2 && rng.gen::<f32>() < 0.6
                }
                ActionType::Chow => rng.gen::<f32>() < 0.3,
                _ => false,
            },
        }
    }
}
