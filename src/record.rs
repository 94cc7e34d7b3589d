use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::game::state::WinType;

/// 每位玩家的终局数据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerData {
    pub user_id: u64,
    pub player_name: String,
    pub score_delta: i32,
    pub is_winner: bool,
    pub is_dealer: bool,
    pub tai_count: u32,
}

/// 一局的完整记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub room_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<u64>,
    pub win_type: WinType,
    pub tai_count: u32,
    pub player_data: Vec<PlayerData>,
}

/// 终局记录接收器
///
/// 外部协作方：真实实现负责写库与更新用户战绩，游戏层只在
/// GAME_OVER 时调用一次。
pub trait RecordSink: Send + Sync {
    fn create(&self, record: GameRecord);
}

/// 默认实现：只打结构化日志
pub struct LoggingRecordSink;

impl RecordSink for LoggingRecordSink {
    fn create(&self, record: GameRecord) {
        info!(
            room = %record.room_id,
            win_type = ?record.win_type,
            tai = record.tai_count,
            winner = ?record.winner_id,
            "对局记录"
        );
    }
}

/// 留存在内存里的接收器，测试断言用
#[derive(Default)]
pub struct MemoryRecordSink {
    records: Mutex<Vec<GameRecord>>,
}

impl MemoryRecordSink {
    pub fn records(&self) -> Vec<GameRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl RecordSink for MemoryRecordSink {
    fn create(&self, record: GameRecord) {
        self.records.lock().push(record);
    }
}
