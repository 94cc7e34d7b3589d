use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::client::{write_pump, Client, Envelope, MAX_MESSAGE_SIZE, PONG_TIMEOUT};
use super::hub::Hub;
use crate::auth::{Claims, TokenValidator};
use crate::game::{GameClient, GameError, GameHub, RoomManager, RoomSettings};
use crate::matchmaking::Queue;

/// 入口路由的共享依赖
pub struct AppState {
    pub hub: Arc<Hub>,
    pub rooms: Arc<RoomManager>,
    pub queue: Arc<Queue>,
    pub auth: Arc<dyn TokenValidator>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct WsQuery {
    #[serde(default)]
    token: String,
}

/// WebSocket 入口：升级前先完成令牌鉴权，无效令牌直接 401
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let claims = match state.auth.validate(&query.token) {
        Ok(claims) => claims,
        Err(err) => {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": err.to_string() })))
                .into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, claims))
}

/// 连接生命周期：注册 → 问候 → 读循环 → 收尾
///
/// 读循环带闲置超时（客户端 Pong 刷新）；连接关闭时退出匹配队列并
/// 注销连接，但不拆房——对局中的座位保留，由计时器代打。
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, claims: Claims) {
    let (sink, mut stream) = socket.split();
    let (client, rx) = Client::new(claims.user_id, claims.display_name);

    state.hub.register(Arc::clone(&client));
    let writer = tokio::spawn(write_pump(rx, sink));

    info!(user = client.user_id, name = %client.display_name, "连接建立");
    client.send(
        "connected",
        json!({ "userId": client.user_id, "displayName": client.display_name }),
    );

    loop {
        let frame = match tokio::time::timeout(PONG_TIMEOUT, stream.next()).await {
            Err(_) => break, // 闲置超时
            Ok(None) => break,
            Ok(Some(Err(_))) => break,
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => {
                if text.len() > MAX_MESSAGE_SIZE {
                    debug!(user = client.user_id, "入站帧超限，忽略");
                    continue;
                }
                match serde_json::from_str::<Envelope>(&text) {
                    Ok(envelope) => dispatch(&state, &client, envelope),
                    Err(err) => debug!(user = client.user_id, %err, "无法解析入站帧"),
                }
            }
            Message::Close(_) => break,
            // Pong 只为刷新上面的读超时；入站 Ping 由底层自动回应
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    state.queue.leave(client.user_id);
    state.hub.unregister(&client);
    writer.abort();
    info!(user = client.user_id, "连接关闭");
}

/// 事件分发
fn dispatch(state: &Arc<AppState>, client: &Arc<Client>, envelope: Envelope) {
    match envelope.event.as_str() {
        "action:join" => handle_join(state, client, envelope.data),
        "action:create_room" => handle_create_room(state, client, envelope.data),
        "action:quickmatch" => handle_quickmatch(state, client),
        "action:discard" => handle_discard(state, client, envelope.data),
        "action:operate" => handle_operate(state, client, envelope.data),
        "game:restart" => handle_restart(state, client),
        "action:leave" => handle_leave(state, client),
        other => debug!(user = client.user_id, event = other, "未知事件"),
    }
}

#[derive(Deserialize)]
struct JoinRequest {
    #[serde(rename = "roomId")]
    room_id: String,
}

fn handle_join(state: &Arc<AppState>, client: &Arc<Client>, data: Value) {
    let Ok(request) = serde_json::from_value::<JoinRequest>(data) else {
        client.send("game:error", json!(GameError::InvalidAction.to_string()));
        return;
    };

    let Some(room) = state.rooms.get_room(&request.room_id) else {
        client.send("game:error", json!(GameError::RoomNotFound.to_string()));
        return;
    };

    if let Err(err) = room.add_player(Arc::clone(client) as Arc<dyn GameClient>) {
        client.send("game:error", json!(err.to_string()));
        return;
    }
    state.hub.join_room(client.user_id, &request.room_id);
}

#[derive(Deserialize)]
struct CreateRoomRequest {
    #[serde(rename = "baseScore", default = "default_base_score")]
    base_score: i32,
    #[serde(rename = "taiScore", default = "default_tai_score")]
    tai_score: i32,
    #[serde(default = "default_rounds")]
    rounds: u32,
    /// 额外请求的机器人数（最多补满三个空位）
    #[serde(rename = "aiPlayers", default)]
    ai_players: usize,
}

fn default_base_score() -> i32 {
    100
}
fn default_tai_score() -> i32 {
    20
}
fn default_rounds() -> u32 {
    1
}

impl Default for CreateRoomRequest {
    fn default() -> Self {
        Self {
            base_score: default_base_score(),
            tai_score: default_tai_score(),
            rounds: default_rounds(),
            ai_players: 0,
        }
    }
}

fn handle_create_room(state: &Arc<AppState>, client: &Arc<Client>, data: Value) {
    // 数据缺失或畸形时沿用默认设置
    let request = serde_json::from_value::<CreateRoomRequest>(data).unwrap_or_default();

    let room = state.rooms.create_room(RoomSettings {
        base_score: request.base_score,
        tai_score: request.tai_score,
        rounds: request.rounds,
        ai_player_count: request.ai_players.min(3),
    });

    if let Err(err) = room.add_player(Arc::clone(client) as Arc<dyn GameClient>) {
        client.send("game:error", json!(err.to_string()));
        return;
    }
    state.hub.join_room(client.user_id, &room.id);
    client.send("room:created", json!({ "roomId": room.id }));

    if request.ai_players > 0 {
        room.add_ai_players();
    }
}

fn handle_quickmatch(state: &Arc<AppState>, client: &Arc<Client>) {
    state.queue.join(Arc::clone(client) as Arc<dyn GameClient>);
    client.send(
        "matchmaking:joined",
        json!({ "message": "Looking for opponents..." }),
    );
}

#[derive(Deserialize)]
struct DiscardRequest {
    #[serde(rename = "tileIndex")]
    tile_index: usize,
}

fn handle_discard(state: &Arc<AppState>, client: &Arc<Client>, data: Value) {
    let room_id = client.room_id();
    if room_id.is_empty() {
        client.send("game:error", json!(GameError::RoomNotFound.to_string()));
        return;
    }
    let Ok(request) = serde_json::from_value::<DiscardRequest>(data) else {
        client.send("game:error", json!(GameError::InvalidAction.to_string()));
        return;
    };
    let Some(room) = state.rooms.get_room(&room_id) else {
        client.send("game:error", json!(GameError::RoomNotFound.to_string()));
        return;
    };
    room.handle_discard(client.as_ref(), request.tile_index);
}

#[derive(Deserialize)]
struct OperateRequest {
    action: String,
}

fn handle_operate(state: &Arc<AppState>, client: &Arc<Client>, data: Value) {
    let room_id = client.room_id();
    if room_id.is_empty() {
        client.send("game:error", json!(GameError::RoomNotFound.to_string()));
        return;
    }
    let Ok(request) = serde_json::from_value::<OperateRequest>(data) else {
        client.send("game:error", json!(GameError::InvalidAction.to_string()));
        return;
    };
    let Some(room) = state.rooms.get_room(&room_id) else {
        client.send("game:error", json!(GameError::RoomNotFound.to_string()));
        return;
    };
    room.handle_operation(client.as_ref(), &request.action);
}

fn handle_restart(state: &Arc<AppState>, client: &Arc<Client>) {
    let room_id = client.room_id();
    if room_id.is_empty() {
        client.send("game:error", json!(GameError::RoomNotFound.to_string()));
        return;
    }
    let Some(room) = state.rooms.get_room(&room_id) else {
        client.send("game:error", json!(GameError::RoomNotFound.to_string()));
        return;
    };
    room.restart();
}

fn handle_leave(state: &Arc<AppState>, client: &Arc<Client>) {
    let room_id = client.room_id();
    if room_id.is_empty() {
        return;
    }
    if let Some(room) = state.rooms.get_room(&room_id) {
        room.remove_player(client.user_id);
    }
    state.hub.leave_room(client.user_id, &room_id);
    client.send("room:left", Value::Null);
}
