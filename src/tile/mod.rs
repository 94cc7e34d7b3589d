/// 牌与规则内核
///
/// 牌型、牌墙、手牌、胡牌判定与算台。全部为纯逻辑，不做任何 I/O。
pub mod deck;
pub mod hand;
pub mod rules;
pub mod scoring;
pub mod tile;

pub use deck::Deck;
pub use hand::Hand;
pub use rules::Rules;
pub use scoring::{ScoreCalculator, ScoreItem, ScoreResult};
pub use tile::{sort_tiles, Meld, MeldKind, Suit, Tile, Wind};
