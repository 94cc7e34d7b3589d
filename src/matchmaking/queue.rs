use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::info;

use crate::game::GameClient;

/// 一桌人数
pub const PLAYERS_PER_GAME: usize = 4;
/// found 与 ready 之间留给客户端的提示间隔
const READY_DELAY: Duration = Duration::from_millis(500);

/// 匹配成功后的建房能力（由房间管理器实现）
pub trait RoomCreator: Send + Sync {
    /// `players` 按入队顺序排列
    fn create_match_room(&self, players: Vec<Arc<dyn GameClient>>);
}

/// 先进先出的匹配队列
///
/// 互斥锁保护队列本体，信号通道唤醒撮合循环。
pub struct Queue {
    players: Mutex<Vec<Arc<dyn GameClient>>>,
    creator: Arc<dyn RoomCreator>,
    notify_tx: mpsc::Sender<()>,
    notify_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl Queue {
    pub fn new(creator: Arc<dyn RoomCreator>) -> Arc<Self> {
        let (notify_tx, notify_rx) = mpsc::channel(1);
        Arc::new(Self {
            players: Mutex::new(Vec::new()),
            creator,
            notify_tx,
            notify_rx: Mutex::new(Some(notify_rx)),
        })
    }

    /// 撮合循环：每收到一次信号就尽量放行整批
    pub async fn run(self: Arc<Self>) {
        let Some(mut rx) = self.notify_rx.lock().take() else {
            return;
        };
        while rx.recv().await.is_some() {
            self.try_match().await;
        }
    }

    /// 入队；同一用户重复排队直接忽略
    pub fn join(&self, client: Arc<dyn GameClient>) {
        {
            let mut players = self.players.lock();
            if players.iter().any(|p| p.user_id() == client.user_id()) {
                return;
            }
            players.push(client);
        }
        // 信号通道容量为 1，挤不进去说明已有待处理信号
        let _ = self.notify_tx.try_send(());
    }

    /// 按用户号出队（断线或主动取消）
    pub fn leave(&self, user_id: u64) {
        self.players.lock().retain(|p| p.user_id() != user_id);
    }

    pub fn len(&self) -> usize {
        self.players.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.lock().is_empty()
    }

    /// 只要凑得够就持续放行队首四人
    async fn try_match(&self) {
        loop {
            let batch: Vec<Arc<dyn GameClient>> = {
                let mut players = self.players.lock();
                if players.len() < PLAYERS_PER_GAME {
                    return;
                }
                players.drain(..PLAYERS_PER_GAME).collect()
            };

            info!("匹配成功，放行一桌");
            for client in &batch {
                client.send(
                    "matchmaking:found",
                    json!({ "message": "Match found! Starting game..." }),
                );
            }

            tokio::time::sleep(READY_DELAY).await;
            for client in &batch {
                client.send("matchmaking:ready", json!({ "players": batch.len() }));
            }

            self.creator.create_match_room(batch);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI32, Ordering};

    use serde_json::Value;

    use super::*;

    struct FakeClient {
        id: u64,
        seat: AtomicI32,
        events: Mutex<Vec<String>>,
    }

    impl FakeClient {
        fn new(id: u64) -> Arc<Self> {
            Arc::new(Self {
                id,
                seat: AtomicI32::new(-1),
                events: Mutex::new(Vec::new()),
            })
        }
    }

    impl GameClient for FakeClient {
        fn user_id(&self) -> u64 {
            self.id
        }
        fn display_name(&self) -> &str {
            "測試"
        }
        fn seat_index(&self) -> i32 {
            self.seat.load(Ordering::SeqCst)
        }
        fn set_seat_index(&self, index: i32) {
            self.seat.store(index, Ordering::SeqCst);
        }
        fn send(&self, event: &str, _data: Value) {
            self.events.lock().push(event.to_string());
        }
    }

    /// 记录放行批次的假建房器
    #[derive(Default)]
    struct FakeCreator {
        batches: Mutex<Vec<Vec<u64>>>,
    }

    impl RoomCreator for FakeCreator {
        fn create_match_room(&self, players: Vec<Arc<dyn GameClient>>) {
            self.batches
                .lock()
                .push(players.iter().map(|p| p.user_id()).collect());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_releases_batch_in_join_order() {
        let creator = Arc::new(FakeCreator::default());
        let queue = Queue::new(creator.clone());
        tokio::spawn(Arc::clone(&queue).run());

        let clients: Vec<_> = (1..=5).map(FakeClient::new).collect();
        for c in &clients {
            queue.join(c.clone());
        }

        tokio::time::sleep(Duration::from_secs(1)).await;

        // 前四名按入队顺序放行，第五名留队
        let batches = creator.batches.lock();
        assert_eq!(batches.as_slice(), &[vec![1, 2, 3, 4]]);
        assert_eq!(queue.len(), 1);

        for c in &clients[..4] {
            let events = c.events.lock();
            assert!(events.contains(&"matchmaking:found".to_string()));
            assert!(events.contains(&"matchmaking:ready".to_string()));
        }
        assert!(clients[4].events.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_join_rejected() {
        let queue = Queue::new(Arc::new(FakeCreator::default()));
        let client = FakeClient::new(7);

        queue.join(client.clone());
        queue.join(client.clone());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leave_removes_by_user_id() {
        let queue = Queue::new(Arc::new(FakeCreator::default()));
        queue.join(FakeClient::new(1));
        queue.join(FakeClient::new(2));

        queue.leave(1);
        assert_eq!(queue.len(), 1);
        queue.leave(99);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drains_multiple_batches() {
        let creator = Arc::new(FakeCreator::default());
        let queue = Queue::new(creator.clone());
        tokio::spawn(Arc::clone(&queue).run());

        for i in 1..=8 {
            queue.join(FakeClient::new(i));
        }
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(creator.batches.lock().len(), 2);
        assert!(queue.is_empty());
    }
}
