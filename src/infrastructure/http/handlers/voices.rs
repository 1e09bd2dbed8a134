//! Voice Handlers

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::application::{ListVoices, VoiceInfo};
use crate::infrastructure::http::dto::{ApiResponse, ListVoicesParams};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 获取音色列表
pub async fn list_voices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListVoicesParams>,
) -> Result<Json<ApiResponse<Vec<VoiceInfo>>>, ApiError> {
    let voices = state
        .list_voices_handler
        .handle(ListVoices {
            locale: params.locale,
        })
        .await?;

    Ok(Json(ApiResponse::success(voices)))
}
