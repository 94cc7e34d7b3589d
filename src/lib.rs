/// 台湾十六张麻将对战服务器
///
/// 纯规则内核（`tile`）+ 每房间状态机与编排（`game`）+ 连接中枢与
/// 入口路由（`socket`）+ 匹配队列（`matchmaking`）+ 机器人（`bot`）。
/// 身份校验与记录持久化是外部协作方，这里只定义契约（`auth`、`record`）。
pub mod auth;
pub mod bot;
pub mod config;
pub mod game;
pub mod matchmaking;
pub mod record;
pub mod socket;
pub mod tile;

// 重新导出常用类型
pub use bot::{Bot, BotClient, Difficulty};
pub use config::Config;
pub use game::{
    ActionType, GameClient, GameError, GameHub, GamePhase, GameSnapshot, GameState, Player,
    PlayerInfo, Room, RoomManager, RoomSettings, WinType,
};
pub use matchmaking::{Queue, RoomCreator};
pub use record::{GameRecord, LoggingRecordSink, MemoryRecordSink, RecordSink};
pub use socket::{AppState, Client, Hub};
pub use tile::{Deck, Hand, Meld, MeldKind, Rules, ScoreCalculator, Suit, Tile, Wind};
