use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use mahjong_server::auth::DevTokenValidator;
use mahjong_server::bot::Difficulty;
use mahjong_server::config::Config;
use mahjong_server::game::{GameHub, RoomManager, RoomSettings};
use mahjong_server::matchmaking::{Queue, RoomCreator};
use mahjong_server::record::LoggingRecordSink;
use mahjong_server::socket::{router, AppState, Hub};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env();
    info!(?config, "配置加载完成");

    // 连接中枢
    let hub = Hub::new();
    tokio::spawn(Arc::clone(&hub).run());

    // 房间管理（记录接收器在正式部署里换成写库实现）
    let record_sink = Arc::new(LoggingRecordSink);
    let default_settings = RoomSettings {
        base_score: config.default_base_score,
        tai_score: config.default_tai_score,
        rounds: config.default_rounds,
        ai_player_count: 0,
    };
    let rooms = RoomManager::new(
        Arc::clone(&hub) as Arc<dyn GameHub>,
        record_sink,
        default_settings,
        Difficulty::parse(&config.bot_difficulty),
    );

    // 匹配队列
    let queue = Queue::new(Arc::clone(&rooms) as Arc<dyn RoomCreator>);
    tokio::spawn(Arc::clone(&queue).run());

    let state = Arc::new(AppState {
        hub,
        rooms,
        queue,
        auth: Arc::new(DevTokenValidator),
    });
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "服务器启动");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("绑定监听地址失败")?;
    axum::serve(listener, app).await.context("服务器异常退出")?;
    Ok(())
}
