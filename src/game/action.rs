use serde::{Deserialize, Serialize};

/// 玩家动作类型
///
/// 线上名称沿用客户端协议（立直写作 RICHII）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    #[serde(rename = "PONG")]
    Pong,
    #[serde(rename = "KONG")]
    Kong,
    #[serde(rename = "CHOW")]
    Chow,
    #[serde(rename = "HU")]
    Hu,
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "RICHII")]
    Riichi,
}

impl ActionType {
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "PONG" => Some(ActionType::Pong),
            "KONG" => Some(ActionType::Kong),
            "CHOW" => Some(ActionType::Chow),
            "HU" => Some(ActionType::Hu),
            "PASS" => Some(ActionType::Pass),
            "RICHII" => Some(ActionType::Riichi),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            ActionType::Pong => "PONG",
            ActionType::Kong => "KONG",
            ActionType::Chow => "CHOW",
            ActionType::Hu => "HU",
            ActionType::Pass => "PASS",
            ActionType::Riichi => "RICHII",
        }
    }

    /// 同一张弃牌上竞争时的优先级：胡 > 杠 > 碰 > 吃
    ///
    /// 过牌与立直不参与竞争，返回 `None`。
    pub fn claim_priority(&self) -> Option<u8> {
        match self {
            ActionType::Hu => Some(3),
            ActionType::Kong => Some(2),
            ActionType::Pong => Some(1),
            ActionType::Chow => Some(0),
            ActionType::Pass | ActionType::Riichi => None,
        }
    }
}
