use rand::seq::SliceRandom;
use rand::thread_rng;

use super::tile::{Suit, Tile};

/// 牌墙（Deck）
///
/// 一副完整的台湾麻将共 144 张：
/// 三门数牌 1-9 各 4 张（108）+ 四风各 4 张（16）+ 三元各 4 张（12）+ 八张各不相同的花牌。
///
/// 摸牌、补花、杠后补牌都从同一端弹出，不划分死墙。
/// 流水号由牌墙自己计数，换一副牌从零重新开始，房间之间互不影响。
#[derive(Debug, Clone)]
pub struct Deck {
    tiles: Vec<Tile>,
}

impl Deck {
    /// 完整牌数：144 张
    pub const TOTAL_COUNT: usize = 144;

    /// 生成一副未洗的完整牌墙
    pub fn new() -> Self {
        let mut tiles = Vec::with_capacity(Self::TOTAL_COUNT);
        let mut serial = 0u32;
        let mut push = |tiles: &mut Vec<Tile>, suit, value| {
            tiles.push(Tile::new(serial, suit, value));
            serial += 1;
        };

        // 数牌：筒、条、万，1-9 各 4 张
        for suit in Suit::numbered() {
            for value in 1..=9 {
                for _ in 0..4 {
                    push(&mut tiles, suit, value);
                }
            }
        }

        // 风牌：东南西北各 4 张
        for value in 1..=4 {
            for _ in 0..4 {
                push(&mut tiles, Suit::Winds, value);
            }
        }

        // 三元牌：中发白各 4 张
        for value in 1..=3 {
            for _ in 0..4 {
                push(&mut tiles, Suit::Dragons, value);
            }
        }

        // 花牌：1-8 各一张
        for value in 1..=8 {
            push(&mut tiles, Suit::Flowers, value);
        }

        Self { tiles }
    }

    /// 洗牌（Fisher-Yates）
    pub fn shuffle(&mut self) {
        self.tiles.shuffle(&mut thread_rng());
    }

    /// 从牌墙末端摸一张牌
    pub fn draw(&mut self) -> Option<Tile> {
        self.tiles.pop()
    }

    /// 剩余牌数
    pub fn remaining(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Deck {
    /// 测试用：构造指定顺序的牌墙（从尾部摸起）
    pub fn from_tiles(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }
}
