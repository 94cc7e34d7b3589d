/// 匹配队列
pub mod queue;

pub use queue::{Queue, RoomCreator, PLAYERS_PER_GAME};
