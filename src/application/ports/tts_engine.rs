//! TTS Engine Port - 语音合成后端抽象
//!
//! 定义单段文本合成的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::synthesis::VoiceParams;

/// TTS 错误
///
/// 流水线不区分临时性和永久性错误，任何一种都视为该片段失败
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),
}

/// 单段合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// 要合成的文本内容（非空）
    pub text: String,
    /// 音色与韵律参数
    pub params: Arc<VoiceParams>,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, params: Arc<VoiceParams>) -> Self {
        Self {
            text: text.into(),
            params,
        }
    }
}

/// 合成结果
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    /// 编码后的音频数据（MP3/WAV 等，由后端决定）
    pub audio_data: Vec<u8>,
    /// 后端声明的 Content-Type
    pub content_type: Option<String>,
}

/// TTS Engine Port
///
/// 外部语音合成服务的抽象接口
#[async_trait]
pub trait TtsEnginePort: Send + Sync {
    /// 合成一段文本，返回该段的完整音频
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, TtsError>;

    /// 检查 TTS 服务是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
