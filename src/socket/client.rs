use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::game::GameClient;

/// 单帧写超时
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);
/// 读闲置上限：客户端的 Pong 会刷新，超时即回收连接
pub const PONG_TIMEOUT: Duration = Duration::from_secs(60);
/// 心跳间隔（读超时的九成）
pub const PING_PERIOD: Duration = Duration::from_secs(54);
/// 入站帧大小上限
pub const MAX_MESSAGE_SIZE: usize = 8192;
/// 出站缓冲帧数；塞满就丢帧，下一份快照会覆盖一切
const SEND_BUFFER: usize = 256;

/// 线上帧封套 `{event, data}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// 一条已鉴权的玩家连接
///
/// 投递只写入有界缓冲，真正的网络写全部发生在写循环里，
/// 任何锁都不会横跨网络操作。
pub struct Client {
    pub user_id: u64,
    pub display_name: String,
    room_id: Mutex<String>,
    seat_index: AtomicI32,
    tx: mpsc::Sender<Envelope>,
}

impl Client {
    pub fn new(user_id: u64, display_name: String) -> (Arc<Self>, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(SEND_BUFFER);
        let client = Arc::new(Self {
            user_id,
            display_name,
            room_id: Mutex::new(String::new()),
            seat_index: AtomicI32::new(-1),
            tx,
        });
        (client, rx)
    }

    pub fn room_id(&self) -> String {
        self.room_id.lock().clone()
    }

    pub fn set_room_id(&self, room_id: &str) {
        *self.room_id.lock() = room_id.to_string();
    }
}

impl GameClient for Client {
    fn user_id(&self) -> u64 {
        self.user_id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn seat_index(&self) -> i32 {
        self.seat_index.load(Ordering::SeqCst)
    }

    fn set_seat_index(&self, index: i32) {
        self.seat_index.store(index, Ordering::SeqCst);
    }

    fn send(&self, event: &str, data: Value) {
        let envelope = Envelope {
            event: event.to_string(),
            data,
        };
        if self.tx.try_send(envelope).is_err() {
            // 缓冲已满：丢这一帧，连接仍视为存活
            debug!(user = self.user_id, event, "出站缓冲已满，丢帧");
        }
    }
}

/// 写循环：排空出站缓冲并按固定节奏发心跳
///
/// 任一写入失败或缓冲被关闭即退出，由连接收尾逻辑回收。
pub async fn write_pump(mut rx: mpsc::Receiver<Envelope>, mut sink: SplitSink<WebSocket, Message>) {
    let mut ping = tokio::time::interval(PING_PERIOD);
    // 第一个 tick 立即到期，先消耗掉
    ping.tick().await;

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(envelope) = frame else {
                    break;
                };
                let text = match serde_json::to_string(&envelope) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(%err, "序列化出站帧失败");
                        continue;
                    }
                };
                match tokio::time::timeout(WRITE_TIMEOUT, sink.send(Message::Text(text))).await {
                    Ok(Ok(())) => {}
                    _ => break,
                }
            }
            _ = ping.tick() => {
                match tokio::time::timeout(WRITE_TIMEOUT, sink.send(Message::Ping(Vec::new()))).await {
                    Ok(Ok(())) => {}
                    _ => break,
                }
            }
        }
    }
}
