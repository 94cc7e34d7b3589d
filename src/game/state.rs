use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::game::action::ActionType;
use crate::game::player::{Player, PlayerInfo};
use crate::game::room::RoomSettings;
use crate::game::snapshot::{GameSnapshot, InitDataDto, LastDiscardDto, PlayerDto, PlayerInfoDto};
use crate::game::GameError;
use crate::tile::{sort_tiles, Deck, Meld, MeldKind, Rules, ScoreCalculator, Tile, Wind};

/// 座位数固定为 4
pub const SEAT_COUNT: usize = 4;

/// 游戏阶段
///
/// 线上名称沿用客户端协议。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    #[serde(rename = "WAITING")]
    Waiting,
    #[serde(rename = "STATE_INIT")]
    Init,
    #[serde(rename = "STATE_DISCARD")]
    Discard,
    #[serde(rename = "STATE_RESOLVE_ACTION")]
    ResolveAction,
    #[serde(rename = "STATE_GAME_OVER")]
    GameOver,
}

/// 终局方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinType {
    #[serde(rename = "ZIMO")]
    Zimo,
    #[serde(rename = "RON")]
    Ron,
    #[serde(rename = "DRAW")]
    Draw,
}

/// 最近一张弃牌及其出处
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastDiscard {
    pub tile: Tile,
    pub seat: usize,
}

/// 开局数据：骰子点数与定风结果
#[derive(Debug, Clone)]
pub struct InitData {
    pub step: &'static str,
    pub dice: [u8; 2],
    pub wind_assignment: [u8; 4],
}

/// 状态迁移对外可见的事件，房间据此广播演出效果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// 响应窗口里执行了一项鸣牌（碰 / 杠 / 吃）
    ClaimExecuted {
        seat: usize,
        action: ActionType,
        tile: Tile,
    },
    /// 自己摸到第四张成暗杠
    SelfKong { seat: usize, tile: Tile },
    RiichiDeclared { seat: usize },
    Won { seat: usize, win_type: WinType },
    RoundDraw,
}

/// 单个房间的权威游戏状态
///
/// 所有修改都经由房间锁串行进入，这里不做任何并发防护。
#[derive(Debug, Clone)]
pub struct GameState {
    pub deck: Deck,
    pub players: Vec<Player>,
    pub current_turn: usize,
    pub phase: GamePhase,
    pub last_discard: Option<LastDiscard>,
    /// 胜者座位，无人胜出（含流局）为 -1
    pub winner_index: i32,
    pub win_type: Option<WinType>,
    pub tai_count: u32,
    pub dealer_index: usize,
    pub round_wind: Wind,
    pub init_data: Option<InitData>,
    pub settings: RoomSettings,
}

impl GameState {
    pub fn new(infos: Vec<PlayerInfo>, settings: RoomSettings) -> Self {
        debug_assert_eq!(infos.len(), SEAT_COUNT);
        let players = infos
            .into_iter()
            .enumerate()
            .map(|(i, info)| Player::new(info, Wind::ALL[i], i == 0))
            .collect();

        Self {
            deck: Deck::new(),
            players,
            current_turn: 0,
            phase: GamePhase::Waiting,
            last_discard: None,
            winner_index: -1,
            win_type: None,
            tai_count: 0,
            dealer_index: 0,
            round_wind: Wind::East,
            init_data: None,
            settings,
        }
    }

    /// 开局：掷骰定庄、按庄家起东依次定风
    ///
    /// 客户端拿到骰子与定风数据后播动画，发牌由房间延迟触发。
    pub fn start_init(&mut self) {
        let mut rng = rand::thread_rng();
        let dice = [rng.gen_range(1..=6u8), rng.gen_range(1..=6u8)];
        let dealer = ((dice[0] + dice[1]) as usize - 1) % SEAT_COUNT;

        self.phase = GamePhase::Init;
        self.dealer_index = dealer;
        self.current_turn = dealer;

        let mut assignment = [0u8; 4];
        for i in 0..SEAT_COUNT {
            let wind = Wind::ALL[(i + SEAT_COUNT - dealer) % SEAT_COUNT];
            self.players[i].wind = wind;
            self.players[i].is_dealer = i == dealer;
            assignment[i] = wind.tile_value();
        }

        self.init_data = Some(InitData {
            step: "DICE",
            dice,
            wind_assignment: assignment,
        });
    }

    /// 发牌：每轮 4 张发 4 轮（每人 16 张），庄家多取一张
    ///
    /// 发完后逐席补花直到无人手上有花，再整体排序进入出牌阶段。
    /// 庄家手握 17 张，不经摸牌直接出牌。
    pub fn deal_cards(&mut self) {
        self.deck.shuffle();

        for _ in 0..4 {
            for seat in 0..SEAT_COUNT {
                for _ in 0..4 {
                    if let Some(tile) = self.deck.draw() {
                        self.players[seat].hand.add(tile);
                    }
                }
            }
        }

        if let Some(extra) = self.deck.draw() {
            self.players[self.dealer_index].hand.add(extra);
        }

        for seat in 0..SEAT_COUNT {
            self.replace_flowers(seat);
        }
        for p in &mut self.players {
            p.hand.sort();
        }

        self.phase = GamePhase::Discard;
        self.current_turn = self.dealer_index;
        if let Some(init) = &mut self.init_data {
            init.step = "REVEAL";
        }
    }

    /// 补花：把手里的花牌移入花池并从牌墙补摸，直到手上无花
    fn replace_flowers(&mut self, seat: usize) {
        while let Some(flower) = self.players[seat].hand.take_flower() {
            self.players[seat].flowers.push(flower);
            if let Some(replacement) = self.deck.draw() {
                self.players[seat].hand.add(replacement);
            }
        }
    }

    /// 出牌：只有当前回合座位在出牌阶段可以调用
    pub fn discard(&mut self, seat: usize, tile_index: usize) -> Result<Tile, GameError> {
        if self.phase != GamePhase::Discard {
            return Err(GameError::InvalidAction);
        }
        if seat != self.current_turn {
            return Err(GameError::NotYourTurn);
        }

        let player = &mut self.players[seat];
        let tile = player.hand.remove_at(tile_index).ok_or(GameError::InvalidAction)?;
        player.discards.push(tile);

        if player.is_riichi && player.riichi_discard_index == -1 {
            player.riichi_discard_index = player.discards.len() as i32 - 1;
        }

        // 摸牌时挂出的自摸/暗杠/立直提示随出牌作废
        player.clear_pending();
        player.hand.sort();

        self.last_discard = Some(LastDiscard { tile, seat });
        Ok(tile)
    }

    /// 计算某座位对当前弃牌可执行的动作（有序：胡、杠、碰、吃）
    ///
    /// 吃只开放给出牌者下家；已立直的座位只剩胡。
    pub fn available_actions(&self, seat: usize) -> SmallVec<[ActionType; 4]> {
        let mut actions = SmallVec::new();
        let Some(ld) = self.last_discard else {
            return actions;
        };
        if ld.seat == seat {
            return actions;
        }

        let player = &self.players[seat];

        let mut test = player.hand.to_vec();
        test.push(ld.tile);
        if Rules::check_win(&test, player.melds.len()) {
            actions.push(ActionType::Hu);
        }

        if player.is_riichi {
            return actions;
        }

        if Rules::can_kong(&player.hand, &ld.tile) {
            actions.push(ActionType::Kong);
        }
        if Rules::can_pong(&player.hand, &ld.tile) {
            actions.push(ActionType::Pong);
        }
        if seat == (ld.seat + 1) % SEAT_COUNT && Rules::can_chow(&player.hand, &ld.tile) {
            actions.push(ActionType::Chow);
        }

        actions
    }

    /// 出牌后铺开响应窗口
    ///
    /// 给每个可响应座位挂上待选动作；有任何人可响应则进入
    /// RESOLVE_ACTION 并返回 `true`，由房间启动响应计时器。
    pub fn open_claim_window(&mut self) -> bool {
        let mut any = false;
        for seat in 0..SEAT_COUNT {
            let actions = self.available_actions(seat);
            if !actions.is_empty() {
                self.players[seat].available_actions = actions;
                self.players[seat].claim_decision = None;
                any = true;
            }
        }
        if any {
            self.phase = GamePhase::ResolveAction;
        }
        any
    }

    /// 处理一项玩家动作
    ///
    /// 出牌阶段处理本回合座位的自摸 / 暗杠 / 立直；
    /// 响应阶段登记鸣牌声明并按优先级裁决。
    pub fn handle_action(&mut self, seat: usize, action: ActionType) -> Result<Vec<GameEvent>, GameError> {
        if seat >= SEAT_COUNT {
            return Err(GameError::InvalidAction);
        }
        match self.phase {
            GamePhase::Discard => self.handle_self_action(seat, action),
            GamePhase::ResolveAction => self.handle_claim(seat, action),
            _ => Err(GameError::InvalidAction),
        }
    }

    /// 出牌阶段的自选动作（对象是刚摸完牌的当前座位）
    fn handle_self_action(&mut self, seat: usize, action: ActionType) -> Result<Vec<GameEvent>, GameError> {
        let mut events = Vec::new();

        if action == ActionType::Pass {
            // 放弃自摸/暗杠/立直提示，继续等该座位出牌
            self.players[seat].clear_pending();
            return Ok(events);
        }

        if seat != self.current_turn {
            return Err(GameError::NotYourTurn);
        }
        if !self.players[seat].available_actions.contains(&action) {
            return Err(GameError::InvalidAction);
        }

        match action {
            ActionType::Hu => {
                self.execute_hu(seat, &mut events);
            }
            ActionType::Kong => {
                self.execute_concealed_kong(seat, &mut events)?;
            }
            ActionType::Riichi => {
                let player = &mut self.players[seat];
                player.is_riichi = true;
                player.clear_pending();
                events.push(GameEvent::RiichiDeclared { seat });
            }
            _ => return Err(GameError::InvalidAction),
        }

        Ok(events)
    }

    /// 响应阶段：登记声明，然后尝试裁决
    fn handle_claim(&mut self, seat: usize, action: ActionType) -> Result<Vec<GameEvent>, GameError> {
        match action {
            ActionType::Pass => {
                let player = &mut self.players[seat];
                player.claim_decision = Some(ActionType::Pass);
                player.available_actions.clear();
            }
            ActionType::Hu | ActionType::Kong | ActionType::Pong | ActionType::Chow => {
                if self.last_discard.is_none() {
                    return Err(GameError::InvalidAction);
                }
                if !self.players[seat].available_actions.contains(&action) {
                    return Err(GameError::InvalidAction);
                }
                self.players[seat].claim_decision = Some(action);
            }
            ActionType::Riichi => return Err(GameError::InvalidAction),
        }

        Ok(self.resolve_claims())
    }

    /// 响应计时器到点：所有未表态的座位按过牌处理
    pub fn claim_timeout(&mut self) -> Vec<GameEvent> {
        if self.phase != GamePhase::ResolveAction {
            return Vec::new();
        }
        for player in &mut self.players {
            if player.is_undecided() {
                player.claim_decision = Some(ActionType::Pass);
                player.available_actions.clear();
            }
        }
        self.resolve_claims()
    }

    /// 按优先级裁决已登记的声明
    ///
    /// 只要还有未表态座位可能压过当前最优声明（更高优先级，或同为胡但
    /// 离出牌者更近），就继续等；否则立即执行最优声明。全员过则进下一轮。
    fn resolve_claims(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let Some(ld) = self.last_discard else {
            return events;
        };
        // 顺时针距出牌者的距离，胡牌相争时近者优先
        let proximity = |seat: usize| (seat + SEAT_COUNT - ld.seat) % SEAT_COUNT;

        let mut best: Option<(usize, ActionType)> = None;
        for (seat, player) in self.players.iter().enumerate() {
            let Some(decision) = player.claim_decision else {
                continue;
            };
            let Some(priority) = decision.claim_priority() else {
                continue;
            };
            let beats = match best {
                None => true,
                Some((best_seat, best_action)) => {
                    let best_priority = best_action.claim_priority().unwrap_or(0);
                    priority > best_priority
                        || (priority == best_priority && proximity(seat) < proximity(best_seat))
                }
            };
            if beats {
                best = Some((seat, decision));
            }
        }

        for (seat, player) in self.players.iter().enumerate() {
            if !player.is_undecided() {
                continue;
            }
            let Some((best_seat, best_action)) = best else {
                // 有声明前只要还有人未表态就继续等
                return events;
            };
            let best_priority = best_action.claim_priority().unwrap_or(0);
            let max_priority = player
                .available_actions
                .iter()
                .filter_map(|a| a.claim_priority())
                .max()
                .unwrap_or(0);
            let could_beat = max_priority > best_priority
                || (max_priority == best_priority
                    && best_action == ActionType::Hu
                    && proximity(seat) < proximity(best_seat));
            if could_beat {
                return events;
            }
        }

        match best {
            None => {
                // 全员过牌
                self.clear_claims();
                self.next_turn(&mut events);
            }
            Some((seat, action)) => {
                self.execute_claim(seat, action, &mut events);
            }
        }
        events
    }

    fn execute_claim(&mut self, seat: usize, action: ActionType, events: &mut Vec<GameEvent>) {
        match action {
            ActionType::Pong => self.execute_pong(seat, events),
            ActionType::Kong => self.execute_kong(seat, events),
            ActionType::Chow => self.execute_chow(seat, events),
            ActionType::Hu => self.execute_hu(seat, events),
            _ => {}
        }
    }

    /// 碰：收走弃牌，亮出刻子，轮到鸣牌者出牌
    fn execute_pong(&mut self, seat: usize, events: &mut Vec<GameEvent>) {
        let Some(ld) = self.last_discard.take() else {
            return;
        };

        let player = &mut self.players[seat];
        let mut tiles = Vec::with_capacity(3);
        for _ in 0..2 {
            if let Some(t) = player.hand.remove_one(&ld.tile) {
                tiles.push(t);
            }
        }
        tiles.push(ld.tile);
        player.melds.push(Meld {
            kind: MeldKind::Pong,
            tiles,
            from_seat: ld.seat,
        });

        self.players[ld.seat].discards.pop();
        self.phase = GamePhase::Discard;
        self.current_turn = seat;
        self.clear_claims();
        events.push(GameEvent::ClaimExecuted {
            seat,
            action: ActionType::Pong,
            tile: ld.tile,
        });
    }

    /// 明杠：收走弃牌亮杠，从牌墙补一张（遇花再补）
    fn execute_kong(&mut self, seat: usize, events: &mut Vec<GameEvent>) {
        let Some(ld) = self.last_discard.take() else {
            return;
        };

        let player = &mut self.players[seat];
        let mut tiles = Vec::with_capacity(4);
        for _ in 0..3 {
            if let Some(t) = player.hand.remove_one(&ld.tile) {
                tiles.push(t);
            }
        }
        tiles.push(ld.tile);
        player.melds.push(Meld {
            kind: MeldKind::Kong,
            tiles,
            from_seat: ld.seat,
        });

        self.players[ld.seat].discards.pop();
        self.draw_kong_replacement(seat);

        self.phase = GamePhase::Discard;
        self.current_turn = seat;
        self.clear_claims();
        events.push(GameEvent::ClaimExecuted {
            seat,
            action: ActionType::Kong,
            tile: ld.tile,
        });
    }

    /// 吃：按固定顺序选出搭子，亮出顺子
    fn execute_chow(&mut self, seat: usize, events: &mut Vec<GameEvent>) {
        let Some(ld) = self.last_discard else {
            return;
        };
        let Some((first, second)) = Rules::choose_chow(&self.players[seat].hand, &ld.tile) else {
            return;
        };
        self.last_discard = None;

        let player = &mut self.players[seat];
        player.hand.remove_one(&first);
        player.hand.remove_one(&second);

        let mut tiles = vec![first, second, ld.tile];
        sort_tiles(&mut tiles);
        player.melds.push(Meld {
            kind: MeldKind::Chow,
            tiles,
            from_seat: ld.seat,
        });

        self.players[ld.seat].discards.pop();
        self.phase = GamePhase::Discard;
        self.current_turn = seat;
        self.clear_claims();
        events.push(GameEvent::ClaimExecuted {
            seat,
            action: ActionType::Chow,
            tile: ld.tile,
        });
    }

    /// 暗杠：摸到第四张后把四张收进明牌区（来源记自己），再补一张
    ///
    /// 不换手，等该座位继续出牌。
    fn execute_concealed_kong(&mut self, seat: usize, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let player = &self.players[seat];
        let kong_tile = player
            .hand
            .iter()
            .copied()
            .find(|t| player.hand.count_of(t) == 4)
            .ok_or(GameError::InvalidAction)?;

        let player = &mut self.players[seat];
        let mut tiles = Vec::with_capacity(4);
        for _ in 0..4 {
            if let Some(t) = player.hand.remove_one(&kong_tile) {
                tiles.push(t);
            }
        }
        player.melds.push(Meld {
            kind: MeldKind::Kong,
            tiles,
            from_seat: seat,
        });
        player.clear_pending();

        self.draw_kong_replacement(seat);
        events.push(GameEvent::SelfKong { seat, tile: kong_tile });
        Ok(())
    }

    /// 杠后补牌：花牌入花池后继续补
    fn draw_kong_replacement(&mut self, seat: usize) {
        while let Some(tile) = self.deck.draw() {
            if tile.is_flower() {
                self.players[seat].flowers.push(tile);
                continue;
            }
            self.players[seat].hand.add(tile);
            self.players[seat].hand.sort();
            break;
        }
    }

    /// 胡牌结算
    ///
    /// 荣和时把放铳张并入胜者手牌（同时从弃牌堆移走，保持全桌 144 张守恒），
    /// 算台后按自摸三家付 / 荣和放铳者单付更新分差与累计分。
    fn execute_hu(&mut self, seat: usize, events: &mut Vec<GameEvent>) {
        let is_zimo = match self.last_discard {
            None => true,
            Some(ld) => ld.seat == seat,
        };

        let mut discarder: Option<usize> = None;
        if !is_zimo {
            if let Some(ld) = self.last_discard.take() {
                self.players[ld.seat].discards.pop();
                self.players[seat].hand.add(ld.tile);
                self.players[seat].hand.sort();
                discarder = Some(ld.seat);
            }
        }

        let win_type = if is_zimo { WinType::Zimo } else { WinType::Ron };

        let winner = &self.players[seat];
        let score = ScoreCalculator::score(
            &winner.hand.to_vec(),
            &winner.melds,
            &winner.flowers,
            is_zimo,
            winner.is_dealer,
            winner.wind,
            self.round_wind,
        );
        self.tai_count = score.tai;

        let payout = self.settings.base_score + self.settings.tai_score * score.tai as i32;
        if is_zimo {
            for (i, p) in self.players.iter_mut().enumerate() {
                p.score_delta = if i == seat { payout * 3 } else { -payout };
            }
        } else if let Some(loser) = discarder {
            self.players[seat].score_delta = payout;
            self.players[loser].score_delta = -payout;
            self.players[loser].is_loser = true;
        }

        // 分差记入累计分
        for p in &mut self.players {
            p.score += p.score_delta;
        }

        self.players[seat].is_winner = true;
        self.players[seat].tai_count = score.tai;
        self.winner_index = seat as i32;
        self.win_type = Some(win_type);
        self.phase = GamePhase::GameOver;
        self.last_discard = None;
        self.clear_claims();
        events.push(GameEvent::Won { seat, win_type });
    }

    /// 轮转：下一座位摸牌（补花后入手），挂出自摸 / 暗杠 / 立直提示
    ///
    /// 牌墙摸空即流局。
    pub fn next_turn(&mut self, events: &mut Vec<GameEvent>) {
        if self.deck.is_empty() {
            self.end_game_draw(events);
            return;
        }

        self.current_turn = (self.current_turn + 1) % SEAT_COUNT;
        let seat = self.current_turn;

        let drawn = loop {
            match self.deck.draw() {
                None => {
                    self.end_game_draw(events);
                    return;
                }
                Some(t) if t.is_flower() => self.players[seat].flowers.push(t),
                Some(t) => break t,
            }
        };

        self.players[seat].hand.add(drawn);
        self.players[seat].hand.sort();
        self.phase = GamePhase::Discard;
        self.last_discard = None;

        let player = &self.players[seat];
        let concealed = player.hand.to_vec();
        let mut actions: SmallVec<[ActionType; 4]> = SmallVec::new();
        if Rules::check_win(&concealed, player.melds.len()) {
            actions.push(ActionType::Hu);
        }
        if player.hand.count_of(&drawn) == 4 {
            actions.push(ActionType::Kong);
        }
        if !player.is_riichi && Rules::can_riichi(&concealed, player.melds.len()) {
            actions.push(ActionType::Riichi);
        }
        self.players[seat].available_actions = actions;
    }

    fn end_game_draw(&mut self, events: &mut Vec<GameEvent>) {
        self.win_type = Some(WinType::Draw);
        self.phase = GamePhase::GameOver;
        self.winner_index = -1;
        self.clear_claims();
        events.push(GameEvent::RoundDraw);
    }

    fn clear_claims(&mut self) {
        for p in &mut self.players {
            p.clear_pending();
        }
    }

    /// 给指定座位生成个性化快照；终局时所有手牌公开
    pub fn personal_snapshot(&self, viewer: usize) -> GameSnapshot {
        self.snapshot(Some(viewer))
    }

    pub fn snapshot(&self, viewer: Option<usize>) -> GameSnapshot {
        let game_over = self.phase == GamePhase::GameOver;

        let players = self
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let reveal = game_over || viewer == Some(i);
                PlayerDto {
                    info: PlayerInfoDto {
                        id: p.info.id,
                        name: p.info.display_name.clone(),
                        score: p.score,
                        round_score_delta: p.score_delta,
                        is_dealer: p.is_dealer,
                        flower_count: p.flowers.len(),
                        flowers: p.flowers.clone(),
                        wind: p.wind,
                        seat_wind: p.seat_wind,
                        is_riichi: p.is_riichi,
                        riichi_discard_index: p.riichi_discard_index,
                        is_winner: p.is_winner,
                        is_loser: p.is_loser,
                        tai: p.tai_count,
                    },
                    hand_count: p.hand.len(),
                    discards: p.discards.clone(),
                    melds: p.melds.clone(),
                    hand: reveal.then(|| p.hand.to_vec()),
                }
            })
            .collect();

        GameSnapshot {
            deck_count: self.deck.remaining(),
            players,
            turn: self.current_turn,
            state: self.phase,
            last_discard: self.last_discard.map(|ld| LastDiscardDto {
                tile: ld.tile,
                player_index: ld.seat,
            }),
            init_data: self.init_data.as_ref().map(|init| InitDataDto {
                step: init.step.to_string(),
                dice_values: init.dice,
                wind_assignment: init.wind_assignment,
            }),
            winner_index: game_over.then_some(self.winner_index),
            win_type: if game_over { self.win_type } else { None },
            available_actions: viewer
                .map(|v| self.players[v].available_actions.to_vec())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Suit;

    fn infos() -> Vec<PlayerInfo> {
        (0..4)
            .map(|i| PlayerInfo {
                id: i as u64 + 1,
                display_name: format!("玩家{}", i + 1),
            })
            .collect()
    }

    fn settings() -> RoomSettings {
        RoomSettings {
            base_score: 100,
            tai_score: 20,
            rounds: 1,
            ai_player_count: 0,
        }
    }

    fn dealt_state() -> GameState {
        let mut gs = GameState::new(infos(), settings());
        gs.start_init();
        gs.deal_cards();
        gs
    }

    fn t(suit: Suit, value: u8) -> Tile {
        Tile::probe(suit, value)
    }

    /// 把一个座位的手牌整体替换（测试用）
    fn set_hand(gs: &mut GameState, seat: usize, tiles: Vec<Tile>) {
        gs.players[seat].hand = crate::tile::Hand::from(tiles);
        gs.players[seat].hand.sort();
    }

    #[test]
    fn test_start_init_assigns_winds() {
        let mut gs = GameState::new(infos(), settings());
        gs.start_init();

        assert_eq!(gs.phase, GamePhase::Init);
        let dealer = gs.dealer_index;
        assert_eq!(gs.current_turn, dealer);
        assert!(gs.players[dealer].is_dealer);
        assert_eq!(gs.players[dealer].wind, Wind::East);
        // 下家是南风
        assert_eq!(gs.players[(dealer + 1) % 4].wind, Wind::South);

        let init = gs.init_data.as_ref().unwrap();
        assert_eq!(init.step, "DICE");
        let dealer_from_dice = ((init.dice[0] + init.dice[1]) as usize - 1) % 4;
        assert_eq!(dealer_from_dice, dealer);
    }

    #[test]
    fn test_deal_cards_counts() {
        let gs = dealt_state();

        assert_eq!(gs.phase, GamePhase::Discard);
        assert_eq!(gs.current_turn, gs.dealer_index);
        for (i, p) in gs.players.iter().enumerate() {
            let expect = if i == gs.dealer_index { 17 } else { 16 };
            assert_eq!(p.hand.len(), expect, "座位 {} 牌数", i);
            // 补花后手上不应再有花牌
            assert!(p.hand.iter().all(|t| !t.is_flower()));
        }
        assert_eq!(gs.init_data.as_ref().unwrap().step, "REVEAL");
    }

    #[test]
    fn test_tile_conservation_after_deal() {
        let gs = dealt_state();

        let mut total = gs.deck.remaining();
        for p in &gs.players {
            total += p.hand.len() + p.discards.len() + p.flowers.len();
            total += p.melds.iter().map(|m| m.tiles.len()).sum::<usize>();
        }
        assert_eq!(total, Deck::TOTAL_COUNT);
    }

    #[test]
    fn test_discard_validation() {
        let mut gs = dealt_state();
        let dealer = gs.dealer_index;
        let other = (dealer + 1) % 4;

        assert_eq!(gs.discard(other, 0), Err(GameError::NotYourTurn));
        assert_eq!(gs.discard(dealer, 99), Err(GameError::InvalidAction));

        let before = gs.players[dealer].hand.len();
        let tile = gs.discard(dealer, 0).unwrap();
        assert_eq!(gs.players[dealer].hand.len(), before - 1);
        assert_eq!(gs.players[dealer].discards.last(), Some(&tile));
        assert_eq!(gs.last_discard.unwrap().seat, dealer);
    }

    #[test]
    fn test_chow_only_for_next_seat() {
        let mut gs = dealt_state();
        let discarder = gs.dealer_index;
        let next = (discarder + 1) % 4;
        let across = (discarder + 2) % 4;

        // 下家与对家都持有 (2,3)筒，弃 1筒
        set_hand(&mut gs, next, vec![t(Suit::Dots, 2), t(Suit::Dots, 3)]);
        set_hand(&mut gs, across, vec![t(Suit::Dots, 2), t(Suit::Dots, 3)]);
        gs.last_discard = Some(LastDiscard {
            tile: t(Suit::Dots, 1),
            seat: discarder,
        });

        assert!(gs.available_actions(next).contains(&ActionType::Chow));
        assert!(!gs.available_actions(across).contains(&ActionType::Chow));
        // 出牌者自己永远没有动作
        assert!(gs.available_actions(discarder).is_empty());
    }

    #[test]
    fn test_riichi_locks_to_hu() {
        let mut gs = dealt_state();
        let discarder = gs.dealer_index;
        let seat = (discarder + 1) % 4;

        set_hand(&mut gs, seat, vec![t(Suit::Dots, 5), t(Suit::Dots, 5)]);
        gs.players[seat].is_riichi = true;
        gs.last_discard = Some(LastDiscard {
            tile: t(Suit::Dots, 5),
            seat: discarder,
        });

        // 本可碰杠，但立直后只剩胡（此处无胡型，应为空）
        assert!(gs.available_actions(seat).is_empty());
    }

    #[test]
    fn test_pong_executes_when_no_better_claim() {
        let mut gs = dealt_state();
        let discarder = gs.current_turn;
        let claimer = (discarder + 2) % 4;

        // 只给 claimer 留响应：两张等值牌可碰
        let discard_idx = 0;
        let tile = gs.players[discarder].hand.as_slice()[discard_idx];
        set_hand(&mut gs, claimer, vec![tile, tile, t(Suit::Winds, 1), t(Suit::Winds, 2)]);
        for other in 0..4 {
            if other != claimer && other != discarder {
                set_hand(&mut gs, other, vec![t(Suit::Winds, 3), t(Suit::Winds, 4)]);
            }
        }

        gs.discard(discarder, discard_idx).unwrap();
        assert!(gs.open_claim_window());
        assert_eq!(gs.phase, GamePhase::ResolveAction);

        let events = gs.handle_action(claimer, ActionType::Pong).unwrap();
        assert!(matches!(
            events.as_slice(),
            [GameEvent::ClaimExecuted {
                action: ActionType::Pong,
                ..
            }]
        ));
        assert_eq!(gs.phase, GamePhase::Discard);
        assert_eq!(gs.current_turn, claimer);
        assert!(gs.last_discard.is_none());
        // 弃牌被收走
        assert!(gs.players[discarder].discards.is_empty());
        let meld = &gs.players[claimer].melds[0];
        assert_eq!(meld.kind, MeldKind::Pong);
        assert_eq!(meld.from_seat, discarder);
    }

    #[test]
    fn test_hu_preempts_registered_pong() {
        let mut gs = dealt_state();
        let discarder = gs.current_turn;
        let ponger = (discarder + 1) % 4;
        let winner = (discarder + 2) % 4;

        // 出 5筒；ponger 能碰，winner 荣和（对碰听 5筒）
        let five = t(Suit::Dots, 5);
        let mut hand = gs.players[discarder].hand.to_vec();
        hand[0] = five;
        set_hand(&mut gs, discarder, hand);

        set_hand(&mut gs, ponger, vec![five, five, t(Suit::Winds, 1)]);
        let mut win_hand = Vec::new();
        win_hand.extend([five, five]);
        for v in 1..=3 {
            win_hand.push(t(Suit::Characters, v));
        }
        for v in 4..=6 {
            win_hand.push(t(Suit::Characters, v));
        }
        for v in 7..=9 {
            win_hand.push(t(Suit::Characters, v));
        }
        win_hand.push(t(Suit::Winds, 3));
        win_hand.push(t(Suit::Winds, 3));
        win_hand.push(t(Suit::Winds, 3));
        win_hand.push(t(Suit::Dragons, 1));
        win_hand.push(t(Suit::Dragons, 1));
        assert_eq!(win_hand.len(), 16);
        set_hand(&mut gs, winner, win_hand);
        set_hand(&mut gs, (discarder + 3) % 4, vec![t(Suit::Winds, 4)]);

        let idx = gs.players[discarder]
            .hand
            .iter()
            .position(|x| *x == five)
            .unwrap();
        gs.discard(discarder, idx).unwrap();
        assert!(gs.open_claim_window());

        // 碰先到：不能立即执行，因为 winner 还可能胡
        let events = gs.handle_action(ponger, ActionType::Pong).unwrap();
        assert!(events.is_empty());
        assert_eq!(gs.phase, GamePhase::ResolveAction);

        // 胡后到：立即压过碰执行
        let events = gs.handle_action(winner, ActionType::Hu).unwrap();
        assert!(matches!(
            events.as_slice(),
            [GameEvent::Won {
                win_type: WinType::Ron,
                ..
            }]
        ));
        assert_eq!(gs.phase, GamePhase::GameOver);
        assert_eq!(gs.winner_index, winner as i32);
        // 被抢先的碰已清空
        assert!(gs.players[ponger].available_actions.is_empty());
        assert!(gs.players[ponger].melds.is_empty());

        // 荣和只有放铳者赔：分差零和
        let payout = 100 + 20 * gs.tai_count as i32;
        assert_eq!(gs.players[winner].score_delta, payout);
        assert_eq!(gs.players[discarder].score_delta, -payout);
        assert!(gs.players[discarder].is_loser);
        let sum: i32 = gs.players.iter().map(|p| p.score_delta).sum();
        assert_eq!(sum, 0);
    }

    #[test]
    fn test_claim_timeout_passes_everyone() {
        let mut gs = dealt_state();
        let discarder = gs.current_turn;
        let claimer = (discarder + 2) % 4;

        let tile = gs.players[discarder].hand.as_slice()[0];
        set_hand(&mut gs, claimer, vec![tile, tile, t(Suit::Winds, 1), t(Suit::Winds, 2)]);
        for other in 0..4 {
            if other != claimer && other != discarder {
                set_hand(&mut gs, other, vec![t(Suit::Winds, 3), t(Suit::Winds, 4)]);
            }
        }

        gs.discard(discarder, 0).unwrap();
        assert!(gs.open_claim_window());

        // 无人表态，超时后全员过、进下一轮
        let events = gs.claim_timeout();
        assert!(events.is_empty());
        assert_eq!(gs.phase, GamePhase::Discard);
        assert_eq!(gs.current_turn, (discarder + 1) % 4);
        assert!(gs.players.iter().all(|p| p.claim_decision.is_none()));
    }

    #[test]
    fn test_timeout_executes_registered_claim() {
        let mut gs = dealt_state();
        let discarder = gs.current_turn;
        let ponger = (discarder + 1) % 4;
        let other = (discarder + 2) % 4;

        let five = t(Suit::Bamboo, 5);
        let mut hand = gs.players[discarder].hand.to_vec();
        hand[0] = five;
        set_hand(&mut gs, discarder, hand);
        set_hand(&mut gs, ponger, vec![five, five, t(Suit::Winds, 1)]);
        // 给 other 三张同牌：它的明杠优先级高于碰
        set_hand(&mut gs, other, vec![five, five, five, t(Suit::Winds, 2)]);
        set_hand(&mut gs, (discarder + 3) % 4, vec![t(Suit::Winds, 4)]);

        let idx = gs.players[discarder].hand.iter().position(|x| *x == five).unwrap();
        gs.discard(discarder, idx).unwrap();
        assert!(gs.open_claim_window());

        // 低优先级的碰先登记：other 还可能杠，必须等待
        let events = gs.handle_action(ponger, ActionType::Pong).unwrap();
        assert!(events.is_empty());

        // 超时：other 视为过，碰立即执行
        let events = gs.claim_timeout();
        assert!(matches!(
            events.as_slice(),
            [GameEvent::ClaimExecuted {
                action: ActionType::Pong,
                ..
            }]
        ));
        assert_eq!(gs.current_turn, ponger);
    }

    #[test]
    fn test_kong_replacement_cascade() {
        let mut gs = dealt_state();
        let seat = gs.current_turn;

        // 制造暗杠：手里已有三张，再“摸”到第四张
        let four = t(Suit::Characters, 8);
        set_hand(&mut gs, seat, vec![four, four, four, four, t(Suit::Winds, 1)]);
        gs.players[seat].available_actions.clear();
        gs.players[seat].available_actions.push(ActionType::Kong);

        // 定制牌墙：补牌先摸到花，再摸到 9筒（从尾部摸起）
        gs.deck = Deck::from_tiles(vec![t(Suit::Dots, 9), Tile::probe(Suit::Flowers, 5)]);

        let flowers_before = gs.players[seat].flowers.len();
        let events = gs.handle_action(seat, ActionType::Kong).unwrap();
        assert!(matches!(events.as_slice(), [GameEvent::SelfKong { .. }]));

        let meld = &gs.players[seat].melds[0];
        assert_eq!(meld.kind, MeldKind::Kong);
        assert_eq!(meld.tiles.len(), 4);
        // 暗杠来源记自己
        assert_eq!(meld.from_seat, seat);
        // 花牌入花池，继续补到 9筒
        assert_eq!(gs.players[seat].flowers.len(), flowers_before + 1);
        assert!(gs.players[seat].hand.iter().any(|x| *x == t(Suit::Dots, 9)));
        // 补牌后仍轮到自己出牌，不换手
        assert_eq!(gs.current_turn, seat);
        assert_eq!(gs.phase, GamePhase::Discard);
    }

    #[test]
    fn test_zimo_payout() {
        let mut gs = dealt_state();
        // 强制庄家回合并给出既成胡型 + 一张花
        let dealer = gs.dealer_index;
        gs.current_turn = dealer;
        gs.phase = GamePhase::Discard;
        gs.last_discard = None;

        let mut hand = Vec::new();
        for v in 1..=3 {
            hand.push(t(Suit::Dots, v));
        }
        for v in 4..=6 {
            hand.push(t(Suit::Dots, v));
        }
        for v in 1..=3 {
            hand.push(t(Suit::Bamboo, v));
        }
        for v in 4..=6 {
            hand.push(t(Suit::Bamboo, v));
        }
        for v in 7..=9 {
            hand.push(t(Suit::Bamboo, v));
        }
        hand.push(t(Suit::Characters, 2));
        hand.push(t(Suit::Characters, 2));
        assert_eq!(hand.len(), 17);
        set_hand(&mut gs, dealer, hand);
        gs.players[dealer].flowers = vec![t(Suit::Flowers, 1)];
        gs.players[dealer].available_actions.push(ActionType::Hu);

        let events = gs.handle_action(dealer, ActionType::Hu).unwrap();
        assert!(matches!(
            events.as_slice(),
            [GameEvent::Won {
                win_type: WinType::Zimo,
                ..
            }]
        ));

        // 1 底 + 1 自摸 + 1 庄 + 1 花 = 4 台 → 100 + 20×4 = 180
        assert_eq!(gs.tai_count, 4);
        assert_eq!(gs.players[dealer].score_delta, 540);
        for (i, p) in gs.players.iter().enumerate() {
            if i != dealer {
                assert_eq!(p.score_delta, -180);
            }
            // 分差已计入累计分
            assert_eq!(p.score, p.score_delta);
        }
        let sum: i32 = gs.players.iter().map(|p| p.score_delta).sum();
        assert_eq!(sum, 0);
    }

    #[test]
    fn test_draw_on_deck_exhaustion() {
        let mut gs = dealt_state();
        while gs.deck.draw().is_some() {}

        let mut events = Vec::new();
        gs.next_turn(&mut events);
        assert!(matches!(events.as_slice(), [GameEvent::RoundDraw]));
        assert_eq!(gs.phase, GamePhase::GameOver);
        assert_eq!(gs.win_type, Some(WinType::Draw));
        assert_eq!(gs.winner_index, -1);
        assert!(gs.players.iter().all(|p| p.score_delta == 0));
    }

    #[test]
    fn test_snapshot_hides_other_hands() {
        let gs = dealt_state();
        let snap = gs.personal_snapshot(0);

        assert!(snap.players[0].hand.is_some());
        for i in 1..4 {
            assert!(snap.players[i].hand.is_none());
            assert!(snap.players[i].hand_count > 0);
        }
        assert_eq!(snap.deck_count, gs.deck.remaining());

        // 公开快照不带任何手牌，也不带待选动作
        let public = gs.snapshot(None);
        assert!(public.players.iter().all(|p| p.hand.is_none()));
        assert!(public.available_actions.is_empty());
    }

    #[test]
    fn test_snapshot_reveals_all_at_game_over() {
        let mut gs = dealt_state();
        let mut events = Vec::new();
        gs.end_game_draw(&mut events);

        let snap = gs.personal_snapshot(2);
        assert!(snap.players.iter().all(|p| p.hand.is_some()));
        assert_eq!(snap.winner_index, Some(-1));
        assert_eq!(snap.win_type, Some(WinType::Draw));
    }

    #[test]
    fn test_riichi_discard_index_recorded() {
        let mut gs = dealt_state();
        let seat = gs.current_turn;

        gs.players[seat].available_actions.push(ActionType::Riichi);
        gs.handle_action(seat, ActionType::Riichi).unwrap();
        assert!(gs.players[seat].is_riichi);
        assert_eq!(gs.players[seat].riichi_discard_index, -1);

        gs.discard(seat, 0).unwrap();
        assert_eq!(gs.players[seat].riichi_discard_index, 0);

        // 之后的弃牌不再改动这个序号
        gs.phase = GamePhase::Discard;
        gs.current_turn = seat;
        gs.discard(seat, 0).unwrap();
        assert_eq!(gs.players[seat].riichi_discard_index, 0);
    }
}
