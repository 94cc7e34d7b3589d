use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rand::Rng;
use serde_json::{json, Value};
use smallvec::SmallVec;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bot::{BotAction, BotClient, Difficulty};
use crate::game::snapshot::GameEffect;
use crate::game::state::{GameEvent, GamePhase, GameState, WinType, SEAT_COUNT};
use crate::game::{ActionType, GameClient, GameError, GameHub, PlayerInfo};
use crate::matchmaking::RoomCreator;
use crate::record::{GameRecord, PlayerData, RecordSink};

pub const MAX_PLAYERS_PER_ROOM: usize = SEAT_COUNT;

/// 响应窗口与自动出牌共用的超时
pub const ACTION_TIMEOUT: Duration = Duration::from_secs(10);
/// 开局动画窗口：掷骰快照发出后等这么久再发牌
const DEAL_DELAY: Duration = Duration::from_secs(2);
/// 机器人动作的轮询上限与间隔
const BOT_WAIT_MAX: Duration = Duration::from_secs(3);
const BOT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// 机器人虚拟用户号起点，避开真实用户
const BOT_ID_BASE: u64 = 1_000_000;

/// 房间设置
#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub base_score: i32,
    pub tai_score: i32,
    pub rounds: u32,
    pub ai_player_count: usize,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            base_score: 100,
            tai_score: 20,
            rounds: 1,
            ai_player_count: 0,
        }
    }
}

/// 锁内状态：座位、权威游戏状态与两类计时器
///
/// 同类计时器最多同时存在一个，重设前必须先撤销旧的。
struct RoomInner {
    players: Vec<Arc<dyn GameClient>>,
    state: Option<GameState>,
    claim_timer: Option<JoinHandle<()>>,
    discard_timer: Option<JoinHandle<()>>,
    record_saved: bool,
}

/// 对局房间
///
/// 单把互斥锁串行化所有状态迁移与计时器操作；任何迁移都不与另一个并发。
/// 锁内绝不做网络写，出站一律经各连接的有界缓冲。
pub struct Room {
    pub id: String,
    pub settings: RoomSettings,
    hub: Arc<dyn GameHub>,
    record_sink: Arc<dyn RecordSink>,
    bot_difficulty: Difficulty,
    inner: Mutex<RoomInner>,
    /// 自引用，供计时器与后台任务拿到自身的强引用
    me: Weak<Room>,
}

impl Room {
    fn new(
        id: String,
        settings: RoomSettings,
        hub: Arc<dyn GameHub>,
        record_sink: Arc<dyn RecordSink>,
        bot_difficulty: Difficulty,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            id,
            settings,
            hub,
            record_sink,
            bot_difficulty,
            inner: Mutex::new(RoomInner {
                players: Vec::with_capacity(MAX_PLAYERS_PER_ROOM),
                state: None,
                claim_timer: None,
                discard_timer: None,
                record_saved: false,
            }),
            me: me.clone(),
        })
    }

    /// 入座
    ///
    /// 满员或对局进行中会被拒绝；坐满四人自动开局。
    pub fn add_player(&self, client: Arc<dyn GameClient>) -> Result<(), GameError> {
        let mut inner = self.inner.lock();

        if inner.players.len() >= MAX_PLAYERS_PER_ROOM {
            return Err(GameError::RoomFull);
        }
        if let Some(state) = &inner.state {
            if !matches!(state.phase, GamePhase::Waiting | GamePhase::GameOver) {
                return Err(GameError::GameInProgress);
            }
        }

        client.set_seat_index(inner.players.len() as i32);
        inner.players.push(client);
        self.broadcast_player_list(&inner);

        if inner.players.len() == MAX_PLAYERS_PER_ROOM {
            self.spawn_start_game();
        }
        Ok(())
    }

    /// 离座（大厅语义；对局中的断线不走这里，座位保留由计时器代打）
    pub fn remove_player(&self, user_id: u64) {
        let mut inner = self.inner.lock();
        if let Some(pos) = inner.players.iter().position(|p| p.user_id() == user_id) {
            inner.players.remove(pos);
        }
        for (i, p) in inner.players.iter().enumerate() {
            p.set_seat_index(i as i32);
        }
        self.broadcast_player_list(&inner);
    }

    /// 用机器人填满空位（最多补到设置的数量），坐满即开局
    pub fn add_ai_players(&self) {
        let mut inner = self.inner.lock();

        let needed = MAX_PLAYERS_PER_ROOM.saturating_sub(inner.players.len());
        let count = self.settings.ai_player_count.min(needed);

        for i in 0..count {
            let bot = BotClient::new(
                BOT_ID_BASE + i as u64,
                format!("AI Player {}", i + 1),
                self.bot_difficulty,
            );
            bot.set_seat_index(inner.players.len() as i32);
            inner.players.push(Arc::new(bot));
        }
        self.broadcast_player_list(&inner);

        if inner.players.len() == MAX_PLAYERS_PER_ROOM {
            self.spawn_start_game();
        }
    }

    fn spawn_start_game(&self) {
        let Some(room) = self.me.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            room.start_game();
        });
    }

    /// 开局：构建新状态、掷骰定风并广播，随后延迟发牌
    pub fn start_game(&self) {
        let mut inner = self.inner.lock();
        if inner.players.len() < MAX_PLAYERS_PER_ROOM {
            return;
        }

        let infos = Self::seat_infos(&inner);
        let mut state = GameState::new(infos, self.settings.clone());
        state.start_init();
        inner.state = Some(state);
        inner.record_saved = false;

        info!(room = %self.id, "对局开始，等待发牌");
        self.broadcast_state(&mut inner);
        drop(inner);
        self.schedule_deal();
    }

    /// 再来一局：沿用同一批座位，累计分带入新局
    pub fn restart(&self) {
        let mut inner = self.inner.lock();
        let Some(old) = &inner.state else {
            return;
        };
        if old.phase != GamePhase::GameOver {
            return;
        }

        let scores: Vec<i32> = old.players.iter().map(|p| p.score).collect();
        let infos = Self::seat_infos(&inner);
        let mut state = GameState::new(infos, self.settings.clone());
        for (player, score) in state.players.iter_mut().zip(scores) {
            player.score = score;
        }
        state.start_init();
        inner.state = Some(state);
        inner.record_saved = false;

        info!(room = %self.id, "重新开局");
        self.broadcast_state(&mut inner);
        drop(inner);
        self.schedule_deal();
    }

    /// 两秒动画窗口后发牌；期间房间被重置则放弃
    fn schedule_deal(&self) {
        let Some(room) = self.me.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            tokio::time::sleep(DEAL_DELAY).await;

            let mut inner = room.inner.lock();
            match inner.state.as_mut() {
                Some(state) if state.phase == GamePhase::Init => state.deal_cards(),
                _ => return,
            }
            info!(room = %room.id, "发牌完成");
            room.broadcast_state(&mut inner);
        });
    }

    /// 处理出牌请求
    pub fn handle_discard(&self, client: &dyn GameClient, tile_index: usize) {
        let mut inner = self.inner.lock();
        // 玩家主动行动，撤掉自动出牌计时
        Self::stop_timer(&mut inner.discard_timer);

        let seat = client.seat_index();
        if seat < 0 {
            client.send("game:error", json!(GameError::NotYourTurn.to_string()));
            return;
        }

        let result = match inner.state.as_mut() {
            Some(state) => state.discard(seat as usize, tile_index),
            None => return,
        };
        if let Err(err) = result {
            client.send("game:error", json!(err.to_string()));
            return;
        }

        self.broadcast_state(&mut inner);
        self.check_interactions(&mut inner);
    }

    /// 处理鸣牌 / 胡 / 过 / 立直请求
    pub fn handle_operation(&self, client: &dyn GameClient, action: &str) {
        let mut inner = self.inner.lock();

        let Some(action) = ActionType::from_wire(action) else {
            client.send("game:error", json!(GameError::InvalidAction.to_string()));
            return;
        };
        let seat = client.seat_index();
        if seat < 0 {
            client.send("game:error", json!(GameError::NotYourTurn.to_string()));
            return;
        }

        let result = match inner.state.as_mut() {
            Some(state) => state.handle_action(seat as usize, action),
            None => return,
        };
        match result {
            Err(err) => {
                client.send("game:error", json!(err.to_string()));
            }
            Ok(events) => {
                self.process_events(&mut inner, &events);
                self.broadcast_state(&mut inner);
            }
        }
    }

    /// 出牌后的响应检查
    ///
    /// 有人可响应则开窗并起响应计时器；否则直接轮转。
    fn check_interactions(&self, inner: &mut RoomInner) {
        let opened = match inner.state.as_mut() {
            Some(state) => state.open_claim_window(),
            None => return,
        };

        if opened {
            self.broadcast_state(inner);
            self.start_claim_timer(inner);
        } else {
            let mut events = Vec::new();
            if let Some(state) = inner.state.as_mut() {
                state.next_turn(&mut events);
            }
            self.process_events(inner, &events);
            self.broadcast_state(inner);
        }
    }

    /// 响应计时器：到点把未表态者一律按过处理
    fn start_claim_timer(&self, inner: &mut RoomInner) {
        Self::stop_timer(&mut inner.claim_timer);
        let Some(room) = self.me.upgrade() else {
            return;
        };
        inner.claim_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(ACTION_TIMEOUT).await;
            room.claim_timeout();
        }));
    }

    fn claim_timeout(&self) {
        let mut inner = self.inner.lock();
        // 回调落后于状态时不再生效
        let events = match inner.state.as_mut() {
            Some(state) if state.phase == GamePhase::ResolveAction => state.claim_timeout(),
            _ => return,
        };
        debug!(room = %self.id, "响应窗口超时");
        self.process_events(&mut inner, &events);
        self.broadcast_state(&mut inner);
    }

    /// 自动出牌计时器：人类座位超时未出则替它打出最右一张
    fn start_discard_timer(&self, inner: &mut RoomInner) {
        let Some(state) = &inner.state else {
            return;
        };
        if state.phase != GamePhase::Discard {
            return;
        }
        let seat = state.current_turn;

        Self::stop_timer(&mut inner.discard_timer);
        let Some(room) = self.me.upgrade() else {
            return;
        };
        inner.discard_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(ACTION_TIMEOUT).await;
            room.auto_discard(seat);
        }));
    }

    fn auto_discard(&self, seat: usize) {
        let mut inner = self.inner.lock();
        // 只在同一座位仍欠一张弃牌时代打
        let discarded = match inner.state.as_mut() {
            Some(state) if state.phase == GamePhase::Discard && state.current_turn == seat => {
                let len = state.players[seat].hand.len();
                len > 0 && state.discard(seat, len - 1).is_ok()
            }
            _ => false,
        };
        if !discarded {
            return;
        }

        info!(room = %self.id, seat, "超时自动出牌");
        self.broadcast_state(&mut inner);
        self.check_interactions(&mut inner);
    }

    fn stop_timer(slot: &mut Option<JoinHandle<()>>) {
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    /// 给每个座位发个性化快照，然后视阶段驱动机器人或启动出牌计时
    fn broadcast_state(&self, inner: &mut RoomInner) {
        let phase = {
            let Some(state) = &inner.state else {
                return;
            };
            for (i, client) in inner.players.iter().enumerate() {
                let snapshot = state.personal_snapshot(i);
                match serde_json::to_value(&snapshot) {
                    Ok(value) => client.send("game:state", value),
                    Err(err) => warn!(room = %self.id, %err, "快照序列化失败"),
                }
            }
            state.phase
        };

        if matches!(phase, GamePhase::Discard | GamePhase::ResolveAction) {
            // 当前座位是机器人就不给人类计时器
            if !self.drive_bots(inner) {
                self.start_discard_timer(inner);
            }
        }
    }

    /// 驱动需要表态的机器人，返回当前回合座位是否为机器人
    ///
    /// 出牌阶段轮询当前座位；响应阶段轮询每个有待选动作的机器人座位。
    /// 机器人收到快照后自行思考，这里只负责消费它们的动作通道。
    fn drive_bots(&self, inner: &RoomInner) -> bool {
        let Some(state) = &inner.state else {
            return false;
        };

        let mut driven: SmallVec<[usize; 4]> = SmallVec::new();
        match state.phase {
            GamePhase::Discard => {
                let seat = state.current_turn;
                if Self::is_bot(&inner.players, seat) {
                    driven.push(seat);
                }
            }
            GamePhase::ResolveAction => {
                for seat in 0..state.players.len() {
                    if state.players[seat].is_undecided() && Self::is_bot(&inner.players, seat) {
                        driven.push(seat);
                    }
                }
            }
            _ => {}
        }

        for seat in driven {
            let client = inner.players[seat].clone();
            self.spawn_bot_poll(seat, client);
        }

        Self::is_bot(&inner.players, state.current_turn)
    }

    fn is_bot(players: &[Arc<dyn GameClient>], seat: usize) -> bool {
        players.get(seat).map_or(false, |c| c.as_bot().is_some())
    }

    /// 在锁外轮询机器人的动作通道（最长 3 秒），取到后走正常入口
    fn spawn_bot_poll(&self, seat: usize, client: Arc<dyn GameClient>) {
        let Some(room) = self.me.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + BOT_WAIT_MAX;
            while tokio::time::Instant::now() < deadline {
                tokio::time::sleep(BOT_POLL_INTERVAL).await;

                let Some(bot) = client.as_bot() else {
                    return;
                };
                let Some(action) = bot.try_take_action() else {
                    continue;
                };

                if !room.bot_action_still_relevant(seat, &action) {
                    // 轮次已经过去，迟到的动作静默丢弃
                    debug!(room = %room.id, seat, "丢弃过期的机器人动作");
                    return;
                }
                match action {
                    BotAction::Discard(index) => room.handle_discard(client.as_ref(), index),
                    BotAction::Operate(op) => room.handle_operation(client.as_ref(), op.as_wire()),
                }
                return;
            }
        });
    }

    fn bot_action_still_relevant(&self, seat: usize, action: &BotAction) -> bool {
        let inner = self.inner.lock();
        let Some(state) = &inner.state else {
            return false;
        };
        match action {
            BotAction::Discard(_) => state.phase == GamePhase::Discard && state.current_turn == seat,
            BotAction::Operate(op) => match state.phase {
                GamePhase::ResolveAction => {
                    if *op == ActionType::Pass {
                        state.players[seat].is_undecided()
                    } else {
                        state.players[seat].available_actions.contains(op)
                    }
                }
                GamePhase::Discard => {
                    state.current_turn == seat && state.players[seat].available_actions.contains(op)
                }
                _ => false,
            },
        }
    }

    /// 把状态迁移事件翻译成桌面演出，并在终局时落档
    fn process_events(&self, inner: &mut RoomInner, events: &[GameEvent]) {
        for event in events {
            match event {
                GameEvent::ClaimExecuted { seat, action, tile } => {
                    let (kind, text) = match action {
                        ActionType::Pong => ("ACTION_PONG", "碰"),
                        ActionType::Kong => ("ACTION_KONG", "槓"),
                        ActionType::Chow => ("ACTION_CHOW", "吃"),
                        _ => continue,
                    };
                    self.emit_effect(GameEffect::new(kind, text, *seat as i32).with_tile(*tile));
                }
                GameEvent::SelfKong { seat, tile } => {
                    self.emit_effect(GameEffect::new("ACTION_KONG", "槓", *seat as i32).with_tile(*tile));
                }
                GameEvent::RiichiDeclared { seat } => {
                    self.emit_effect(GameEffect::new("TEXT", "立直!", *seat as i32).with_variant("GOLD"));
                }
                GameEvent::Won { seat, win_type } => {
                    let text = if *win_type == WinType::Zimo { "自摸!" } else { "胡了!" };
                    self.emit_effect(GameEffect::new("SHOCKWAVE", "", *seat as i32).with_variant("HU"));
                    self.emit_effect(GameEffect::new("TEXT", text, *seat as i32).with_variant("HU"));
                }
                GameEvent::RoundDraw => {
                    self.emit_effect(GameEffect::new("TEXT", "流局", -1));
                }
            }
        }

        if events
            .iter()
            .any(|e| matches!(e, GameEvent::Won { .. } | GameEvent::RoundDraw))
        {
            self.save_game_record(inner);
        }
    }

    fn emit_effect(&self, effect: GameEffect) {
        if let Ok(value) = serde_json::to_value(&effect) {
            self.hub.broadcast_to_room(&self.id, "game:effect", value);
        }
    }

    fn broadcast_player_list(&self, inner: &RoomInner) {
        let players: Vec<Value> = inner
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| {
                json!({
                    "index": i,
                    "display_name": p.display_name(),
                    "user_id": p.user_id(),
                })
            })
            .collect();

        self.hub.broadcast_to_room(
            &self.id,
            "room:players",
            json!({ "players": players, "count": inner.players.len() }),
        );
    }

    /// 终局落档：通过外部记录接收器持久化
    fn save_game_record(&self, inner: &mut RoomInner) {
        if inner.record_saved {
            return;
        }
        let Some(state) = &inner.state else {
            return;
        };

        let player_data = state
            .players
            .iter()
            .map(|p| PlayerData {
                user_id: p.info.id,
                player_name: p.info.display_name.clone(),
                score_delta: p.score_delta,
                is_winner: p.is_winner,
                is_dealer: p.is_dealer,
                tai_count: p.tai_count,
            })
            .collect();

        let winner_id = (state.winner_index >= 0)
            .then(|| state.players[state.winner_index as usize].info.id);

        self.record_sink.create(GameRecord {
            room_id: self.id.clone(),
            winner_id,
            win_type: state.win_type.unwrap_or(WinType::Draw),
            tai_count: state.tai_count,
            player_data,
        });
        inner.record_saved = true;
        info!(room = %self.id, "对局记录已落档");
    }

    fn seat_infos(inner: &RoomInner) -> Vec<PlayerInfo> {
        inner
            .players
            .iter()
            .map(|c| PlayerInfo {
                id: c.user_id(),
                display_name: c.display_name().to_string(),
            })
            .collect()
    }

    /// 测试与诊断用：读取当前阶段
    pub fn phase(&self) -> Option<GamePhase> {
        self.inner.lock().state.as_ref().map(|s| s.phase)
    }

    pub fn player_count(&self) -> usize {
        self.inner.lock().players.len()
    }

    /// 在锁内读取状态的辅助入口（只读）
    pub fn with_state<R>(&self, f: impl FnOnce(&GameState) -> R) -> Option<R> {
        let inner = self.inner.lock();
        inner.state.as_ref().map(f)
    }
}

/// 房间注册表
pub struct RoomManager {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    hub: Arc<dyn GameHub>,
    record_sink: Arc<dyn RecordSink>,
    bot_difficulty: Difficulty,
    default_settings: RoomSettings,
}

impl RoomManager {
    pub fn new(
        hub: Arc<dyn GameHub>,
        record_sink: Arc<dyn RecordSink>,
        default_settings: RoomSettings,
        bot_difficulty: Difficulty,
    ) -> Arc<Self> {
        Arc::new(Self {
            rooms: RwLock::new(HashMap::new()),
            hub,
            record_sink,
            bot_difficulty,
            default_settings,
        })
    }

    pub fn create_room(&self, settings: RoomSettings) -> Arc<Room> {
        let id = generate_room_id();
        let room = Room::new(
            id.clone(),
            settings,
            Arc::clone(&self.hub),
            Arc::clone(&self.record_sink),
            self.bot_difficulty,
        );
        self.rooms.write().insert(id, Arc::clone(&room));
        room
    }

    pub fn get_room(&self, id: &str) -> Option<Arc<Room>> {
        self.rooms.read().get(id).cloned()
    }

    pub fn remove_room(&self, id: &str) {
        self.rooms.write().remove(id);
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }
}

impl RoomCreator for RoomManager {
    /// 匹配成功的四人按入队顺序入座一间新房
    fn create_match_room(&self, players: Vec<Arc<dyn GameClient>>) {
        let room = self.create_room(self.default_settings.clone());
        info!(room = %room.id, "快速匹配建房");

        for client in players {
            self.hub.join_room(client.user_id(), &room.id);
            client.send("room:created", json!({ "roomId": room.id }));
            if let Err(err) = room.add_player(Arc::clone(&client)) {
                client.send("game:error", json!(err.to_string()));
            }
        }
    }
}

/// 8 位十六进制房号
fn generate_room_id() -> String {
    let n: u32 = rand::thread_rng().gen();
    format!("{:08x}", n)
}
