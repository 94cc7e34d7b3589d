/// 游戏逻辑模块
///
/// 每个房间的权威状态、状态迁移、房间编排与快照。
/// 连接层与游戏层之间只通过这里定义的窄接口互相引用，避免循环依赖。
use std::fmt;

use serde_json::Value;

pub mod action;
pub mod player;
pub mod room;
pub mod snapshot;
pub mod state;

pub use action::ActionType;
pub use player::{Player, PlayerInfo};
pub use room::{Room, RoomManager, RoomSettings};
pub use snapshot::{GameEffect, GameSnapshot};
pub use state::{GameEvent, GamePhase, GameState, WinType};

/// 游戏层错误
///
/// 全部以 `game:error` 文本回给出错的那条连接，绝不跨房间传播。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    RoomNotFound,
    RoomFull,
    GameInProgress,
    NotYourTurn,
    InvalidAction,
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            GameError::RoomNotFound => "Room not found",
            GameError::RoomFull => "Room is full",
            GameError::GameInProgress => "Game already in progress",
            GameError::NotYourTurn => "Not your turn",
            GameError::InvalidAction => "Invalid action",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for GameError {}

/// 房间看到的连接能力
///
/// 人类连接与机器人都实现这一接口，房间逻辑对两者不做分支；
/// 唯一的例外是跳过机器人的自动出牌计时器，由 `as_bot` 承担该类型判断。
pub trait GameClient: Send + Sync {
    fn user_id(&self) -> u64;
    fn display_name(&self) -> &str;
    fn seat_index(&self) -> i32;
    fn set_seat_index(&self, index: i32);
    /// 投递一帧事件；实现必须非阻塞（满则丢弃）
    fn send(&self, event: &str, data: Value);
    fn as_bot(&self) -> Option<&crate::bot::BotClient> {
        None
    }
}

/// 游戏层看到的连接中枢能力
pub trait GameHub: Send + Sync {
    fn join_room(&self, user_id: u64, room_id: &str);
    fn leave_room(&self, user_id: u64, room_id: &str);
    fn broadcast_to_room(&self, room_id: &str, event: &str, data: Value);
}
