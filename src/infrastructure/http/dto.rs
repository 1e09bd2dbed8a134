//! Data Transfer Objects

use serde::{Deserialize, Serialize};

use crate::domain::synthesis::MergeOutcome;

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// TTS DTOs
// ============================================================================

/// 合成请求，省略的字段使用配置中的默认值
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub rate: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub pitch: Option<String>,
    #[serde(default)]
    pub enable_chunking: Option<bool>,
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub concurrency: Option<usize>,
}

/// base64 合成响应
#[derive(Debug, Serialize)]
pub struct SynthesizeResponse {
    /// base64 编码的音频
    pub audio: String,
    /// 原始音频字节数
    pub size: usize,
    pub content_type: String,
    pub segments: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeOutcome>,
}

// ============================================================================
// Voice DTOs
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListVoicesParams {
    #[serde(default)]
    pub locale: Option<String>,
}
