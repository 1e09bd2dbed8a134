//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping          GET   健康检查
//! - /api/voices        GET   音色列表（?locale=zh-CN 过滤）
//! - /api/tts           POST  合成，JSON 返回 base64 音频
//! - /api/tts/audio     POST  合成，直接返回音频
//! - /ws/events         WS    合并事件推送

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws/events", get(handlers::events_websocket_handler))
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/voices", get(handlers::list_voices))
        .route("/tts", post(handlers::synthesize))
        .route("/tts/audio", post(handlers::synthesize_audio))
}
