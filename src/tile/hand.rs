use super::tile::{sort_tiles, Suit, Tile};

/// 手牌
///
/// 逻辑上是多重集，展示上始终保持排序；出牌通过显示序号定位，
/// 因此内部用有序 Vec 而不是计数表。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hand {
    tiles: Vec<Tile>,
}

impl Hand {
    pub fn new() -> Self {
        Self { tiles: Vec::new() }
    }

    /// 加入一张牌（不自动排序，摸完一批后统一 `sort`）
    pub fn add(&mut self, tile: Tile) {
        self.tiles.push(tile);
    }

    /// 按显示顺序排序
    pub fn sort(&mut self) {
        sort_tiles(&mut self.tiles);
    }

    /// 按显示序号取走一张牌
    pub fn remove_at(&mut self, index: usize) -> Option<Tile> {
        if index >= self.tiles.len() {
            return None;
        }
        Some(self.tiles.remove(index))
    }

    /// 取走一张等值牌（按花色数值匹配第一张）
    pub fn remove_one(&mut self, tile: &Tile) -> Option<Tile> {
        let pos = self.tiles.iter().position(|t| t == tile)?;
        Some(self.tiles.remove(pos))
    }

    /// 等值牌的张数
    pub fn count_of(&self, tile: &Tile) -> usize {
        self.tiles.iter().filter(|t| *t == tile).count()
    }

    /// 找一张指定花色数值的牌（返回实体，保留流水号）
    pub fn find(&self, suit: Suit, value: u8) -> Option<Tile> {
        self.tiles.iter().find(|t| t.suit == suit && t.value == value).copied()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn as_slice(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tile> {
        self.tiles.iter()
    }

    /// 抽走第一张花牌（补花用）
    pub fn take_flower(&mut self) -> Option<Tile> {
        let pos = self.tiles.iter().position(|t| t.is_flower())?;
        Some(self.tiles.remove(pos))
    }

    pub fn to_vec(&self) -> Vec<Tile> {
        self.tiles.clone()
    }
}

impl From<Vec<Tile>> for Hand {
    fn from(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }
}
