use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use super::ai::{Bot, Difficulty};
use crate::game::action::ActionType;
use crate::game::snapshot::GameSnapshot;
use crate::game::state::GamePhase;
use crate::game::GameClient;
use crate::tile::Tile;

/// 机器人产出的一项动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotAction {
    Discard(usize),
    Operate(ActionType),
}

/// 机器人连接
///
/// 与人类连接实现同一套能力接口：房间照常推送个性化快照，机器人
/// 解析同样的快照结构，模拟 0.5–2 秒思考后把动作放进有界通道，
/// 由所属房间在锁外轮询消费。
pub struct BotClient {
    user_id: u64,
    display_name: String,
    seat_index: Arc<AtomicI32>,
    state_tx: mpsc::UnboundedSender<GameSnapshot>,
    action_rx: Mutex<mpsc::Receiver<BotAction>>,
}

impl BotClient {
    pub fn new(user_id: u64, display_name: String, difficulty: Difficulty) -> Self {
        let (state_tx, state_rx) = mpsc::unbounded_channel();
        let (action_tx, action_rx) = mpsc::channel(10);
        let seat_index = Arc::new(AtomicI32::new(-1));

        tokio::spawn(drive(
            Bot::new(difficulty),
            state_rx,
            action_tx,
            Arc::clone(&seat_index),
        ));

        Self {
            user_id,
            display_name,
            seat_index,
            state_tx,
            action_rx: Mutex::new(action_rx),
        }
    }

    /// 非阻塞地取走一项已决定的动作
    pub fn try_take_action(&self) -> Option<BotAction> {
        self.action_rx.lock().try_recv().ok()
    }
}

impl GameClient for BotClient {
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

    /// 机器人只消化 `game:state`，其余事件直接忽略
    fn send(&self, event: &str, data: Value) {
        if event != "game:state" {
            return;
        }
        match serde_json::from_value::<GameSnapshot>(data) {
            Ok(snapshot) => {
                let _ = self.state_tx.send(snapshot);
            }
            Err(err) => debug!(%err, "机器人无法解析快照"),
        }
    }

    fn as_bot(&self) -> Option<&BotClient> {
        Some(self)
    }
}

/// 思考回路：每次只消化最新一帧快照，延迟后至多产出一个动作
async fn drive(
    bot: Bot,
    mut state_rx: mpsc::UnboundedReceiver<GameSnapshot>,
    action_tx: mpsc::Sender<BotAction>,
    seat_index: Arc<AtomicI32>,
) {
    while let Some(mut snapshot) = state_rx.recv().await {
        // 丢掉积压的旧帧
        while let Ok(newer) = state_rx.try_recv() {
            snapshot = newer;
        }

        let seat = seat_index.load(Ordering::SeqCst);
        if seat < 0 {
            continue;
        }
        let seat = seat as usize;
        if !relevant(&snapshot, seat) {
            continue;
        }

        // 模拟思考
        let think_ms = rand::thread_rng().gen_range(500..2000);
        tokio::time::sleep(Duration::from_millis(think_ms)).await;

        if let Some(action) = decide(&bot, &snapshot, seat) {
            // 通道满说明房间已不在消费，丢弃即可
            let _ = action_tx.try_send(action);
        }
    }
}

/// 这帧快照是否轮到自己做事
fn relevant(snapshot: &GameSnapshot, seat: usize) -> bool {
    match snapshot.state {
        GamePhase::Discard => snapshot.turn == seat,
        GamePhase::ResolveAction => !snapshot.available_actions.is_empty(),
        _ => false,
    }
}

fn decide(bot: &Bot, snapshot: &GameSnapshot, seat: usize) -> Option<BotAction> {
    let hand: Vec<Tile> = snapshot
        .players
        .get(seat)
        .and_then(|p| p.hand.clone())
        .unwrap_or_default();

    match snapshot.state {
        GamePhase::Discard => {
            // 先处理摸牌后的自选动作：能胡必胡，暗杠直接开
            if snapshot.available_actions.contains(&ActionType::Hu) {
                return Some(BotAction::Operate(ActionType::Hu));
            }
            if snapshot.available_actions.contains(&ActionType::Kong) {
                return Some(BotAction::Operate(ActionType::Kong));
            }
            let index = bot.decide_discard(&hand)?;
            Some(BotAction::Discard(index))
        }
        GamePhase::ResolveAction => {
            let actions = &snapshot.available_actions;
            if actions.contains(&ActionType::Hu) {
                return Some(BotAction::Operate(ActionType::Hu));
            }

            let discard = snapshot.last_discard.as_ref().map(|ld| ld.tile);
            for action in [ActionType::Kong, ActionType::Pong, ActionType::Chow] {
                if !actions.contains(&action) {
                    continue;
                }
                let take = match discard {
                    Some(tile) => bot.should_claim(action, &hand, &tile),
                    None => action == ActionType::Kong,
                };
                if take {
                    return Some(BotAction::Operate(action));
                }
            }
            Some(BotAction::Operate(ActionType::Pass))
        }
        _ => None,
    }
}
