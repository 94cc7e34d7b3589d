use std::collections::HashMap;

use super::tile::{Meld, MeldKind, Suit, Tile, Wind};

/// 单项台数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreItem {
    pub name: &'static str,
    pub tai: u32,
}

/// 算台结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreResult {
    pub tai: u32,
    pub breakdown: Vec<ScoreItem>,
}

/// 台数计算器
///
/// 胡牌后结算，输入为胡牌时刻的完整立牌（荣和时已并入放铳张）。
/// 纯函数，不修改任何输入。
pub struct ScoreCalculator;

impl ScoreCalculator {
    /// 累计台数
    ///
    /// - 底台 1
    /// - 自摸 +1，庄家 +1，花牌每张 +1
    /// - 清一色 +4；不满足清一色时混一色 +2
    /// - 對對胡 +2
    /// - 三元刻/杠每组 +1；门风刻/杠 +1、圈风刻/杠 +1（同组可叠加）
    /// - 每个杠 +1
    pub fn score(
        concealed: &[Tile],
        melds: &[Meld],
        flowers: &[Tile],
        is_zimo: bool,
        is_dealer: bool,
        seat_wind: Wind,
        round_wind: Wind,
    ) -> ScoreResult {
        let mut result = ScoreResult {
            tai: 0,
            breakdown: Vec::new(),
        };
        let mut add = |result: &mut ScoreResult, name: &'static str, tai: u32| {
            result.tai += tai;
            result.breakdown.push(ScoreItem { name, tai });
        };

        add(&mut result, "基本台", 1);

        if is_zimo {
            add(&mut result, "自摸", 1);
        }
        if is_dealer {
            add(&mut result, "莊家", 1);
        }
        if !flowers.is_empty() {
            add(&mut result, "花牌", flowers.len() as u32);
        }

        if Self::is_pure_suit(concealed, melds) {
            add(&mut result, "清一色", 4);
        } else if Self::is_mixed_suit(concealed, melds) {
            add(&mut result, "混一色", 2);
        }

        if Self::is_all_triplets(concealed, melds) {
            add(&mut result, "對對胡", 2);
        }

        let honor_tai = Self::honor_meld_tai(melds, seat_wind, round_wind);
        if honor_tai > 0 {
            add(&mut result, "番牌", honor_tai);
        }

        let kongs = melds.iter().filter(|m| m.kind == MeldKind::Kong).count() as u32;
        if kongs > 0 {
            add(&mut result, "槓", kongs);
        }

        result
    }

    /// 清一色：所有非花牌同属一门数牌，没有字牌
    fn is_pure_suit(concealed: &[Tile], melds: &[Meld]) -> bool {
        let mut suit: Option<Suit> = None;
        for tile in Self::all_tiles(concealed, melds) {
            if tile.is_flower() {
                continue;
            }
            if !tile.suit.is_numbered() {
                return false;
            }
            match suit {
                None => suit = Some(tile.suit),
                Some(s) if s != tile.suit => return false,
                _ => {}
            }
        }
        suit.is_some()
    }

    /// 混一色：一门数牌加字牌，没有第二门数牌
    fn is_mixed_suit(concealed: &[Tile], melds: &[Meld]) -> bool {
        let mut suit: Option<Suit> = None;
        let mut has_honor = false;
        for tile in Self::all_tiles(concealed, melds) {
            if tile.is_flower() {
                continue;
            }
            if !tile.suit.is_numbered() {
                has_honor = true;
                continue;
            }
            match suit {
                None => suit = Some(tile.suit),
                Some(s) if s != tile.suit => return false,
                _ => {}
            }
        }
        suit.is_some() && has_honor
    }

    /// 對對胡：没有吃出的顺子，且立牌按（花色, 数值）恰好拆成刻子加一个对子
    fn is_all_triplets(concealed: &[Tile], melds: &[Meld]) -> bool {
        if melds.iter().any(|m| m.kind == MeldKind::Chow) {
            return false;
        }

        let mut counts: HashMap<(Suit, u8), usize> = HashMap::new();
        for tile in concealed {
            *counts.entry((tile.suit, tile.value)).or_insert(0) += 1;
        }

        let mut pairs = 0;
        for &count in counts.values() {
            match count {
                3 => {}
                2 => pairs += 1,
                _ => return false,
            }
        }
        pairs == 1
    }

    /// 三元与风刻的台数
    fn honor_meld_tai(melds: &[Meld], seat_wind: Wind, round_wind: Wind) -> u32 {
        let mut tai = 0;
        for meld in melds {
            if meld.kind == MeldKind::Chow {
                continue;
            }
            let Some(tile) = meld.tiles.first() else {
                continue;
            };
            if tile.suit == Suit::Dragons {
                tai += 1;
            }
            if tile.suit == Suit::Winds {
                if tile.value == seat_wind.tile_value() {
                    tai += 1;
                }
                if tile.value == round_wind.tile_value() {
                    tai += 1;
                }
            }
        }
        tai
    }

    fn all_tiles<'a>(concealed: &'a [Tile], melds: &'a [Meld]) -> impl Iterator<Item = &'a Tile> {
        concealed.iter().chain(melds.iter().flat_map(|m| m.tiles.iter()))
    }
}
