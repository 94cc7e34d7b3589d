/// 机器人
///
/// 与人类客户端走同一条协议：接收同样的个性化快照，产出同样的
/// 出牌 / 鸣牌请求。策略按难度分档。
pub mod ai;
pub mod client;

pub use ai::{Bot, Difficulty};
pub use client::{BotAction, BotClient};
