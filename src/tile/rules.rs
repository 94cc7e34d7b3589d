use smallvec::SmallVec;

use super::hand::Hand;
use super::tile::{sort_tiles, Suit, Tile};

/// 规则判定器
///
/// 全部是无副作用的纯函数：输入只读或拷贝，不依赖任何共享状态。
pub struct Rules;

impl Rules {
    /// 判定胡牌：手中立牌能否拆成一个对子加若干顺子/刻子
    ///
    /// 总张数（立牌 + 每组明牌折算 3 张）允许 14、17，或因荣和多出一张的
    /// 15、18。杠的第四张由补牌抵消，不影响拆分。
    ///
    /// # 算法
    ///
    /// 排序后从最小的牌开始递归剥组：先试对子（只取一次），再试刻子，
    /// 最后试以当前最小牌开头的顺子。字牌和花牌永远不组顺子。
    pub fn check_win(concealed: &[Tile], meld_count: usize) -> bool {
        if concealed.is_empty() {
            return false;
        }

        let total = concealed.len() + meld_count * 3;
        if !matches!(total, 14 | 15 | 17 | 18) {
            return false;
        }

        let mut tiles = concealed.to_vec();
        sort_tiles(&mut tiles);
        Self::try_partition(&tiles, false)
    }

    /// 递归拆分：`tiles` 已排序
    fn try_partition(tiles: &[Tile], has_pair: bool) -> bool {
        if tiles.is_empty() {
            return has_pair;
        }

        if tiles.len() == 2 && !has_pair {
            return tiles[0] == tiles[1];
        }

        // 对子（整手只允许一个）
        if !has_pair && tiles.len() >= 2 && tiles[0] == tiles[1] {
            let rest: Vec<Tile> = tiles[2..].to_vec();
            if Self::try_partition(&rest, true) {
                return true;
            }
        }

        // 刻子
        if tiles.len() >= 3 && tiles[0] == tiles[1] && tiles[1] == tiles[2] {
            let rest: Vec<Tile> = tiles[3..].to_vec();
            if Self::try_partition(&rest, has_pair) {
                return true;
            }
        }

        // 顺子：以最小的牌开头，只对数牌有效
        if tiles.len() >= 3 && tiles[0].suit.is_numbered() && tiles[0].value <= 7 {
            let first = tiles[0];
            let second = Tile::probe(first.suit, first.value + 1);
            let third = Tile::probe(first.suit, first.value + 2);
            if tiles.contains(&second) && tiles.contains(&third) {
                let mut rest = tiles.to_vec();
                for target in [first, second, third] {
                    let pos = rest.iter().position(|t| *t == target).unwrap();
                    rest.remove(pos);
                }
                if Self::try_partition(&rest, has_pair) {
                    return true;
                }
            }
        }

        false
    }

    /// 碰：手里已有两张等值牌
    pub fn can_pong(hand: &Hand, discard: &Tile) -> bool {
        hand.count_of(discard) >= 2
    }

    /// 明杠：手里已有三张等值牌
    pub fn can_kong(hand: &Hand, discard: &Tile) -> bool {
        hand.count_of(discard) >= 3
    }

    /// 吃：打出的是数牌，且手里有三种相邻组合之一
    ///
    /// 只有出牌者的下家可以吃，这一限制由调用方保证。
    pub fn can_chow(hand: &Hand, discard: &Tile) -> bool {
        Self::choose_chow(hand, discard).is_some()
    }

    /// 选出吃牌组合（不含被吃的那张）
    ///
    /// 固定按 (t-2, t-1) → (t-1, t+1) → (t+1, t+2) 的顺序取第一个可行组合，
    /// 保证结果确定。
    pub fn choose_chow(hand: &Hand, discard: &Tile) -> Option<(Tile, Tile)> {
        if !discard.suit.is_numbered() {
            return None;
        }

        let v = discard.value;
        let pick = |a: u8, b: u8| -> Option<(Tile, Tile)> {
            let first = hand.find(discard.suit, a)?;
            let second = hand.find(discard.suit, b)?;
            Some((first, second))
        };

        if v >= 3 {
            if let Some(pair) = pick(v - 2, v - 1) {
                return Some(pair);
            }
        }
        if (2..=8).contains(&v) {
            if let Some(pair) = pick(v - 1, v + 1) {
                return Some(pair);
            }
        }
        if v <= 7 {
            if let Some(pair) = pick(v + 1, v + 2) {
                return Some(pair);
            }
        }
        None
    }

    /// 听牌集合：逐一试探 34 种非花牌，加入后能胡的即为等张
    pub fn waiting_tiles(concealed: &[Tile], meld_count: usize) -> Vec<Tile> {
        let mut waiting = Vec::new();
        for probe in Self::all_probe_tiles() {
            let mut test = concealed.to_vec();
            test.push(probe);
            if Self::check_win(&test, meld_count) {
                waiting.push(probe);
            }
        }
        waiting
    }

    /// 是否可以立直（差一张即胡）
    pub fn can_riichi(concealed: &[Tile], meld_count: usize) -> bool {
        !Self::waiting_tiles(concealed, meld_count).is_empty()
    }

    /// 27 种数牌 + 7 种字牌（花牌不参与听牌判定）
    fn all_probe_tiles() -> SmallVec<[Tile; 34]> {
        let mut tiles = SmallVec::new();
        for suit in Suit::numbered() {
            for value in 1..=9 {
                tiles.push(Tile::probe(suit, value));
            }
        }
        for value in 1..=4 {
            tiles.push(Tile::probe(Suit::Winds, value));
        }
        for value in 1..=3 {
            tiles.push(Tile::probe(Suit::Dragons, value));
        }
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(suit: Suit, value: u8) -> Tile {
        Tile::probe(suit, value)
    }

    /// 14 张基本胡型：四组 + 一对
    fn winning_14() -> Vec<Tile> {
        let mut tiles = Vec::new();
        // 123筒 456筒 789条 中中中 + 9万对
        for v in 1..=3 {
            tiles.push(t(Suit::Dots, v));
        }
        for v in 4..=6 {
            tiles.push(t(Suit::Dots, v));
        }
        for v in 7..=9 {
            tiles.push(t(Suit::Bamboo, v));
        }
        for _ in 0..3 {
            tiles.push(t(Suit::Dragons, 1));
        }
        tiles.push(t(Suit::Characters, 9));
        tiles.push(t(Suit::Characters, 9));
        tiles
    }

    #[test]
    fn test_check_win_basic() {
        assert!(Rules::check_win(&winning_14(), 0));
    }

    #[test]
    fn test_check_win_with_melds() {
        // 碰掉一组后立牌 11 张：总数折算仍是 14
        let mut tiles = winning_14();
        tiles.truncate(11);
        assert!(Rules::check_win(&tiles, 1));
    }

    #[test]
    fn test_check_win_rejects_incomplete() {
        let mut tiles = winning_14();
        // 把对子拆掉一张，换成孤张
        tiles.pop();
        tiles.push(t(Suit::Winds, 1));
        assert!(!Rules::check_win(&tiles, 0));
    }

    #[test]
    fn test_honors_never_sequence() {
        // 东南西 + 其余成型：字牌不可当顺子
        let mut tiles = Vec::new();
        tiles.push(t(Suit::Winds, 1));
        tiles.push(t(Suit::Winds, 2));
        tiles.push(t(Suit::Winds, 3));
        for v in 1..=3 {
            tiles.push(t(Suit::Dots, v));
        }
        for v in 4..=6 {
            tiles.push(t(Suit::Dots, v));
        }
        for v in 7..=9 {
            tiles.push(t(Suit::Dots, v));
        }
        tiles.push(t(Suit::Characters, 5));
        tiles.push(t(Suit::Characters, 5));
        assert!(!Rules::check_win(&tiles, 0));
    }

    #[test]
    fn test_seventeen_tile_win() {
        // 台湾麻将标准胡型：五组 + 一对 = 17 张
        let mut tiles = winning_14();
        for v in 1..=3 {
            tiles.push(t(Suit::Characters, v));
        }
        assert_eq!(tiles.len(), 17);
        assert!(Rules::check_win(&tiles, 0));
    }

    #[test]
    fn test_pong_kong_eligibility() {
        let mut hand = Hand::new();
        hand.add(t(Suit::Dots, 5));
        hand.add(t(Suit::Dots, 5));
        let discard = t(Suit::Dots, 5);

        assert!(Rules::can_pong(&hand, &discard));
        assert!(!Rules::can_kong(&hand, &discard));

        hand.add(t(Suit::Dots, 5));
        assert!(Rules::can_kong(&hand, &discard));
    }

    #[test]
    fn test_chow_range() {
        let mut hand = Hand::new();
        hand.add(t(Suit::Dots, 2));
        hand.add(t(Suit::Dots, 3));

        // 1筒只能通过 (2,3) 吃
        let combo = Rules::choose_chow(&hand, &t(Suit::Dots, 1)).unwrap();
        assert_eq!(combo.0, t(Suit::Dots, 2));
        assert_eq!(combo.1, t(Suit::Dots, 3));

        // 9筒需要 (7,8)
        assert!(Rules::choose_chow(&hand, &t(Suit::Dots, 9)).is_none());
        let mut high = Hand::new();
        high.add(t(Suit::Dots, 7));
        high.add(t(Suit::Dots, 8));
        assert!(Rules::can_chow(&high, &t(Suit::Dots, 9)));

        // 字牌永远不能吃
        let mut winds = Hand::new();
        winds.add(t(Suit::Winds, 1));
        winds.add(t(Suit::Winds, 2));
        assert!(!Rules::can_chow(&winds, &t(Suit::Winds, 3)));
    }

    #[test]
    fn test_choose_chow_prefers_lowest_pair() {
        // 手里同时有 (3,4) 和 (6,7)，吃 5 时固定取 (3,4)
        let mut hand = Hand::new();
        for v in [3, 4, 6, 7] {
            hand.add(t(Suit::Bamboo, v));
        }
        let combo = Rules::choose_chow(&hand, &t(Suit::Bamboo, 5)).unwrap();
        assert_eq!(combo.0, t(Suit::Bamboo, 3));
        assert_eq!(combo.1, t(Suit::Bamboo, 4));
    }

    #[test]
    fn test_waiting_tiles() {
        // 13 张，听 3筒 与 6筒（两面听）
        let mut tiles = Vec::new();
        tiles.push(t(Suit::Dots, 4));
        tiles.push(t(Suit::Dots, 5));
        for v in 1..=3 {
            tiles.push(t(Suit::Characters, v));
        }
        for v in 4..=6 {
            tiles.push(t(Suit::Characters, v));
        }
        for _ in 0..3 {
            tiles.push(t(Suit::Dragons, 2));
        }
        tiles.push(t(Suit::Winds, 4));
        tiles.push(t(Suit::Winds, 4));
        assert_eq!(tiles.len(), 13);

        let waiting = Rules::waiting_tiles(&tiles, 0);
        assert!(waiting.contains(&t(Suit::Dots, 3)));
        assert!(waiting.contains(&t(Suit::Dots, 6)));
        assert_eq!(waiting.len(), 2);
        assert!(Rules::can_riichi(&tiles, 0));
    }

    #[test]
    fn test_waiting_excludes_flowers() {
        let tiles = vec![t(Suit::Dots, 1)];
        let waiting = Rules::waiting_tiles(&tiles, 0);
        assert!(waiting.iter().all(|w| !w.is_flower()));
    }
}
