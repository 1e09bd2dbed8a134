//! TTS Handlers

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use std::sync::Arc;

use crate::application::SynthesizeCommand;
use crate::config::SynthesisConfig;
use crate::domain::synthesis::VoiceParams;
use crate::infrastructure::http::dto::{ApiResponse, SynthesizeRequest, SynthesizeResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 单次请求允许的最大并发数
const MAX_CONCURRENCY: usize = 32;

/// 单次请求允许的最大目标片段长度（字符）
const MAX_CHUNK_SIZE: usize = 100_000;

/// 请求 + 默认值 -> 合成命令
fn build_command(req: SynthesizeRequest, defaults: &SynthesisConfig) -> Result<SynthesizeCommand, ApiError> {
    let chunk_size = req.chunk_size.unwrap_or(defaults.chunk_size);
    if chunk_size > MAX_CHUNK_SIZE {
        return Err(ApiError::BadRequest(format!(
            "chunk_size must not exceed {}",
            MAX_CHUNK_SIZE
        )));
    }

    let concurrency = req.concurrency.unwrap_or(defaults.concurrency);
    if concurrency > MAX_CONCURRENCY {
        return Err(ApiError::BadRequest(format!(
            "concurrency must not exceed {}",
            MAX_CONCURRENCY
        )));
    }

    let params = VoiceParams::parse(
        req.voice.as_deref().unwrap_or(&defaults.default_voice),
        req.rate.as_deref().unwrap_or("+0%"),
        req.volume.as_deref().unwrap_or("+0%"),
        req.pitch.as_deref().unwrap_or("+0Hz"),
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(SynthesizeCommand {
        text: req.text,
        params,
        chunking_enabled: req.enable_chunking.unwrap_or(defaults.chunking_enabled),
        chunk_size,
        concurrency,
    })
}

/// 合成并以 base64 返回
pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SynthesizeRequest>,
) -> Result<Json<ApiResponse<SynthesizeResponse>>, ApiError> {
    let command = build_command(req, &state.defaults)?;
    let output = state.synthesize_handler.synthesize(command).await?;

    Ok(Json(ApiResponse::success(SynthesizeResponse {
        size: output.audio.len(),
        audio: base64::engine::general_purpose::STANDARD.encode(&output.audio),
        content_type: output.content_type,
        segments: output.segment_count,
        merge: output.merge,
    })))
}

/// 合成并直接返回音频
pub async fn synthesize_audio(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SynthesizeRequest>,
) -> Result<Response, ApiError> {
    let command = build_command(req, &state.defaults)?;
    let output = state.synthesize_handler.synthesize(command).await?;

    Ok(([(header::CONTENT_TYPE, output.content_type)], output.audio).into_response())
}
