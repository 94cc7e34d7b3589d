/// 连接层
///
/// 每条连接一读一写两个循环；进程级中枢负责路由与房间广播。
pub mod client;
pub mod handlers;
pub mod hub;

pub use client::{Client, Envelope};
pub use handlers::{router, AppState};
pub use hub::Hub;
