use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 花色
///
/// 台湾十六张麻将共六类：筒、条、万三门数牌，风牌、三元牌两类字牌，以及八张花牌。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "DOTS")]
    Dots,
    #[serde(rename = "BAMBOO")]
    Bamboo,
    #[serde(rename = "CHAR")]
    Characters,
    #[serde(rename = "WINDS")]
    Winds,
    #[serde(rename = "DRAGONS")]
    Dragons,
    #[serde(rename = "FLOWERS")]
    Flowers,
}

impl Suit {
    /// 三门数牌
    pub fn numbered() -> [Suit; 3] {
        [Suit::Dots, Suit::Bamboo, Suit::Characters]
    }

    /// 是否为数牌（可组顺子）
    pub fn is_numbered(&self) -> bool {
        matches!(self, Suit::Dots | Suit::Bamboo | Suit::Characters)
    }

    /// 排序权重：筒 < 条 < 万 < 风 < 三元 < 花
    fn order(&self) -> u8 {
        match self {
            Suit::Dots => 0,
            Suit::Bamboo => 1,
            Suit::Characters => 2,
            Suit::Winds => 3,
            Suit::Dragons => 4,
            Suit::Flowers => 5,
        }
    }
}

/// 风位（东南西北）
///
/// 线上传输使用汉字，与客户端的渲染约定一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wind {
    #[serde(rename = "東")]
    East,
    #[serde(rename = "南")]
    South,
    #[serde(rename = "西")]
    West,
    #[serde(rename = "北")]
    North,
}

impl Wind {
    /// 按入座顺序排列（庄家为东）
    pub const ALL: [Wind; 4] = [Wind::East, Wind::South, Wind::West, Wind::North];

    /// 对应的风牌数值（东=1 南=2 西=3 北=4）
    pub fn tile_value(&self) -> u8 {
        match self {
            Wind::East => 1,
            Wind::South => 2,
            Wind::West => 3,
            Wind::North => 4,
        }
    }
}

/// 一张麻将牌
///
/// 规则层的相等性只看（花色, 数值）；`id` 是发牌时分配的流水号，
/// 仅供客户端做动画关联，不参与任何比较。
#[derive(Debug, Clone, Copy)]
pub struct Tile {
    /// 本副牌内的流水号（每副牌独立计数）
    pub id: u32,
    pub suit: Suit,
    pub value: u8,
}

impl Tile {
    pub fn new(id: u32, suit: Suit, value: u8) -> Self {
        Self { id, suit, value }
    }

    /// 构造一张仅用于规则推演的牌（不追踪实体身份）
    pub fn probe(suit: Suit, value: u8) -> Self {
        Self { id: 0, suit, value }
    }

    pub fn is_flower(&self) -> bool {
        self.suit == Suit::Flowers
    }

    /// 排序键：先按花色，再按数值
    pub fn sort_key(&self) -> u16 {
        self.suit.order() as u16 * 100 + self.value as u16
    }
}

/// 相等性按（花色, 数值），不含流水号
impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.suit == other.suit && self.value == other.value
    }
}

impl Eq for Tile {}

/// 哈希必须与相等性一致：同样只混入（花色, 数值）
impl std::hash::Hash for Tile {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.suit.hash(state);
        self.value.hash(state);
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suit = match self.suit {
            Suit::Dots => "筒",
            Suit::Bamboo => "条",
            Suit::Characters => "万",
            Suit::Winds => "风",
            Suit::Dragons => "元",
            Suit::Flowers => "花",
        };
        write!(f, "{}{}", self.value, suit)
    }
}

impl Serialize for Tile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Tile", 4)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("suit", &self.suit)?;
        s.serialize_field("value", &self.value)?;
        s.serialize_field("isFlower", &self.is_flower())?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for Tile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TileVisitor;

        impl<'de> Visitor<'de> for TileVisitor {
            type Value = Tile;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a tile object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Tile, A::Error> {
                let mut id = 0u32;
                let mut suit: Option<Suit> = None;
                let mut value: Option<u8> = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "id" => id = map.next_value()?,
                        "suit" => suit = Some(map.next_value()?),
                        "value" => value = Some(map.next_value()?),
                        // isFlower 由花色推导，读取时忽略
                        _ => {
                            map.next_value::<de::IgnoredAny>()?;
                        }
                    }
                }
                let suit = suit.ok_or_else(|| de::Error::missing_field("suit"))?;
                let value = value.ok_or_else(|| de::Error::missing_field("value"))?;
                Ok(Tile::new(id, suit, value))
            }
        }

        deserializer.deserialize_map(TileVisitor)
    }
}

/// 对牌序列做显示排序（花色优先，数值次之）
pub fn sort_tiles(tiles: &mut [Tile]) {
    tiles.sort_by_key(|t| t.sort_key());
}

/// 明牌组的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeldKind {
    #[serde(rename = "PONG")]
    Pong,
    #[serde(rename = "KONG")]
    Kong,
    #[serde(rename = "CHOW")]
    Chow,
}

/// 明牌组（碰 / 杠 / 吃）
///
/// `from_seat` 记录被鸣牌的出牌座位；暗杠记录持有者自己的座位号。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meld {
    #[serde(rename = "type")]
    pub kind: MeldKind,
    pub tiles: Vec<Tile>,
    #[serde(rename = "fromPlayer")]
    pub from_seat: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_serial() {
        let a = Tile::new(1, Suit::Dots, 5);
        let b = Tile::new(99, Suit::Dots, 5);
        let c = Tile::new(1, Suit::Bamboo, 5);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_sort_order() {
        let mut tiles = vec![
            Tile::probe(Suit::Flowers, 1),
            Tile::probe(Suit::Characters, 3),
            Tile::probe(Suit::Dots, 9),
            Tile::probe(Suit::Winds, 2),
            Tile::probe(Suit::Dots, 1),
        ];
        sort_tiles(&mut tiles);

        assert_eq!(tiles[0], Tile::probe(Suit::Dots, 1));
        assert_eq!(tiles[1], Tile::probe(Suit::Dots, 9));
        assert_eq!(tiles[2], Tile::probe(Suit::Characters, 3));
        assert_eq!(tiles[3], Tile::probe(Suit::Winds, 2));
        assert_eq!(tiles[4], Tile::probe(Suit::Flowers, 1));
    }

    #[test]
    fn test_wire_roundtrip() {
        let tile = Tile::new(17, Suit::Characters, 7);
        let json = serde_json::to_value(&tile).unwrap();

        assert_eq!(json["id"], 17);
        assert_eq!(json["suit"], "CHAR");
        assert_eq!(json["value"], 7);
        assert_eq!(json["isFlower"], false);

        let back: Tile = serde_json::from_value(json).unwrap();
        assert_eq!(back, tile);
        assert_eq!(back.id, 17);
    }

    #[test]
    fn test_flower_wire_shape() {
        let flower = Tile::new(140, Suit::Flowers, 3);
        let json = serde_json::to_value(&flower).unwrap();
        assert_eq!(json["suit"], "FLOWERS");
        assert_eq!(json["isFlower"], true);
    }

    #[test]
    fn test_wind_wire_names() {
        assert_eq!(serde_json::to_value(Wind::East).unwrap(), "東");
        assert_eq!(serde_json::to_value(Wind::North).unwrap(), "北");
        assert_eq!(Wind::South.tile_value(), 2);
    }
}
