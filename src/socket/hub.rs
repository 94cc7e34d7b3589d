use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::client::Client;
use crate::game::{GameClient, GameHub};

/// 房间广播队列深度
const BROADCAST_BUFFER: usize = 256;

/// 房间广播指令
pub struct RoomMessage {
    pub room_id: String,
    pub event: String,
    pub data: Value,
    /// 可选排除某个成员（按用户号）
    pub exclude: Option<u64>,
}

#[derive(Default)]
struct HubMaps {
    /// 用户号 → 活跃连接
    clients: HashMap<u64, Arc<Client>>,
    /// 房号 → 成员集合
    room_members: HashMap<String, HashMap<u64, Arc<Client>>>,
}

struct HubReceivers {
    register_rx: mpsc::UnboundedReceiver<Arc<Client>>,
    unregister_rx: mpsc::UnboundedReceiver<Arc<Client>>,
    broadcast_rx: mpsc::Receiver<RoomMessage>,
}

/// 连接中枢
///
/// 进程级的活跃连接注册表。注册、注销与房间广播汇入单一协调循环，
/// 同一房间的广播因此保持有序；房间成员表由读写锁保护，供同步查询。
pub struct Hub {
    maps: RwLock<HubMaps>,
    register_tx: mpsc::UnboundedSender<Arc<Client>>,
    unregister_tx: mpsc::UnboundedSender<Arc<Client>>,
    broadcast_tx: mpsc::Sender<RoomMessage>,
    receivers: Mutex<Option<HubReceivers>>,
}

impl Hub {
    pub fn new() -> Arc<Self> {
        let (register_tx, register_rx) = mpsc::unbounded_channel();
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, broadcast_rx) = mpsc::channel(BROADCAST_BUFFER);

        Arc::new(Self {
            maps: RwLock::new(HubMaps::default()),
            register_tx,
            unregister_tx,
            broadcast_tx,
            receivers: Mutex::new(Some(HubReceivers {
                register_rx,
                unregister_rx,
                broadcast_rx,
            })),
        })
    }

    /// 协调循环：消化注册 / 注销 / 房间广播三路指令
    pub async fn run(self: Arc<Self>) {
        let Some(mut rx) = self.receivers.lock().take() else {
            return;
        };

        loop {
            tokio::select! {
                client = rx.register_rx.recv() => {
                    let Some(client) = client else { break };
                    self.maps.write().clients.insert(client.user_id, client);
                }
                client = rx.unregister_rx.recv() => {
                    let Some(client) = client else { break };
                    self.remove_client(&client);
                }
                message = rx.broadcast_rx.recv() => {
                    let Some(message) = message else { break };
                    self.deliver(&message);
                }
            }
        }
    }

    pub fn register(&self, client: Arc<Client>) {
        let _ = self.register_tx.send(client);
    }

    pub fn unregister(&self, client: &Arc<Client>) {
        let _ = self.unregister_tx.send(Arc::clone(client));
    }

    pub fn send_to_user(&self, user_id: u64, event: &str, data: Value) {
        let client = self.maps.read().clients.get(&user_id).cloned();
        if let Some(client) = client {
            client.send(event, data);
        }
    }

    pub fn room_member_count(&self, room_id: &str) -> usize {
        self.maps.read().room_members.get(room_id).map_or(0, |m| m.len())
    }

    /// 注销：移出活跃表与所有房间成员表，空房间顺手回收
    fn remove_client(&self, client: &Arc<Client>) {
        let mut maps = self.maps.write();
        maps.clients.remove(&client.user_id);

        let mut emptied = Vec::new();
        for (room_id, members) in maps.room_members.iter_mut() {
            members.remove(&client.user_id);
            if members.is_empty() {
                emptied.push(room_id.clone());
            }
        }
        for room_id in emptied {
            maps.room_members.remove(&room_id);
        }
        debug!(user = client.user_id, "连接已注销");
    }

    /// 把一条房间广播排进每个成员的出站缓冲
    ///
    /// 某个成员缓冲满时只丢它那份，其余成员照常送达。
    fn deliver(&self, message: &RoomMessage) {
        let maps = self.maps.read();
        let Some(members) = maps.room_members.get(&message.room_id) else {
            return;
        };
        for (user_id, client) in members {
            if message.exclude == Some(*user_id) {
                continue;
            }
            client.send(&message.event, message.data.clone());
        }
    }

    fn enqueue(&self, message: RoomMessage) {
        if self.broadcast_tx.try_send(message).is_err() {
            // 广播队列拥塞：丢弃，快照语义下无需补偿
            warn!("房间广播队列已满，丢弃一条消息");
        }
    }

    pub fn broadcast_to_room_except(&self, room_id: &str, event: &str, data: Value, exclude: u64) {
        self.enqueue(RoomMessage {
            room_id: room_id.to_string(),
            event: event.to_string(),
            data,
            exclude: Some(exclude),
        });
    }
}

impl GameHub for Hub {
    /// 幂等：重复加入同一房间只覆盖成员表里的同一项
    fn join_room(&self, user_id: u64, room_id: &str) {
        let mut maps = self.maps.write();
        let Some(client) = maps.clients.get(&user_id).cloned() else {
            // 机器人不注册到中枢，入房是无操作
            return;
        };
        maps.room_members
            .entry(room_id.to_string())
            .or_default()
            .insert(user_id, Arc::clone(&client));
        client.set_room_id(room_id);
    }

    fn leave_room(&self, user_id: u64, room_id: &str) {
        let mut maps = self.maps.write();
        if let Some(members) = maps.room_members.get_mut(room_id) {
            if let Some(client) = members.remove(&user_id) {
                client.set_room_id("");
            }
            if members.is_empty() {
                maps.room_members.remove(room_id);
            }
        }
    }

    fn broadcast_to_room(&self, room_id: &str, event: &str, data: Value) {
        self.enqueue(RoomMessage {
            room_id: room_id.to_string(),
            event: event.to_string(),
            data,
            exclude: None,
        });
    }
}
