//! HTTP TTS Client - 调用外部语音合成服务
//!
//! 实现 TtsEnginePort 与 VoiceCatalogPort
//!
//! 外部 TTS API:
//! POST {base_url}/api/tts/synthesize
//! Request: {"text": "...", "voice": "zh-CN-XiaoxiaoNeural", "rate": "+0%", "volume": "+0%", "pitch": "+0Hz"}
//! Response: 音频二进制（通常为 audio/mpeg）
//!
//! GET {base_url}/api/tts/voices
//! Response: [{"ShortName": "...", "Locale": "...", "LocalName": "...", "Gender": "..."}]

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{
    SynthesisRequest, SynthesizedAudio, TtsEnginePort, TtsError, VoiceCatalogPort, VoiceInfo,
};

/// 合成请求体 (JSON)
#[derive(Debug, Serialize)]
struct TtsHttpRequest<'a> {
    text: &'a str,
    voice: &'a str,
    rate: String,
    volume: String,
    pitch: String,
}

impl<'a> From<&'a SynthesisRequest> for TtsHttpRequest<'a> {
    fn from(request: &'a SynthesisRequest) -> Self {
        Self {
            text: &request.text,
            voice: request.params.voice_id(),
            rate: request.params.rate().to_string(),
            volume: request.params.volume().to_string(),
            pitch: request.params.pitch().to_string(),
        }
    }
}

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// TTS 服务基础 URL
    pub base_url: String,
    /// 单次请求超时时间（秒）
    pub timeout_secs: u64,
    /// 网络错误或 5xx 时的重试次数
    pub max_retries: u32,
    /// 重试间隔基数（毫秒），按尝试次数线性增长
    pub retry_backoff_ms: u64,
}

impl Default for HttpTtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 60,
            max_retries: 2,
            retry_backoff_ms: 200,
        }
    }
}

impl HttpTtsClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// 是否值得重试
fn is_retryable(error: &TtsError) -> bool {
    matches!(error, TtsError::NetworkError(_) | TtsError::Timeout)
}

fn map_send_error(e: reqwest::Error) -> TtsError {
    if e.is_timeout() {
        TtsError::Timeout
    } else if e.is_connect() {
        TtsError::NetworkError(format!("Cannot connect to TTS service: {}", e))
    } else {
        TtsError::NetworkError(e.to_string())
    }
}

/// HTTP TTS 客户端
pub struct HttpTtsClient {
    client: Client,
    config: HttpTtsClientConfig,
}

impl HttpTtsClient {
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn synthesize_url(&self) -> String {
        format!("{}/api/tts/synthesize", self.config.base_url)
    }

    fn voices_url(&self) -> String {
        format!("{}/api/tts/voices", self.config.base_url)
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url)
    }

    /// 单次合成请求，不重试
    async fn synthesize_once(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio, TtsError> {
        let body = TtsHttpRequest::from(request);

        let response = self
            .client
            .post(self.synthesize_url())
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TtsError::VoiceNotFound(body.voice.to_string()));
        }
        if status.is_server_error() {
            let error_text = response.text().await.unwrap_or_default();
            // 5xx 视为临时故障，可重试
            return Err(TtsError::NetworkError(format!("HTTP {}: {}", status, error_text)));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TtsError::ServiceError(format!("HTTP {}: {}", status, error_text)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let audio_data = response
            .bytes()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();

        if audio_data.is_empty() {
            return Err(TtsError::InvalidResponse("Empty audio body".to_string()));
        }

        Ok(SynthesizedAudio {
            audio_data,
            content_type,
        })
    }
}

#[async_trait]
impl TtsEnginePort for HttpTtsClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, TtsError> {
        tracing::debug!(
            url = %self.synthesize_url(),
            chars = request.text.chars().count(),
            voice = %request.params.voice_id(),
            "Sending TTS synthesize request"
        );

        let mut attempt = 0;
        loop {
            match self.synthesize_once(&request).await {
                Ok(audio) => {
                    tracing::debug!(
                        audio_size = audio.audio_data.len(),
                        content_type = ?audio.content_type,
                        attempt,
                        "TTS synthesis completed"
                    );
                    return Ok(audio);
                }
                Err(e) if is_retryable(&e) && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_retries = self.config.max_retries,
                        "TTS request failed, retrying"
                    );
                    let backoff = self.config.retry_backoff_ms * attempt as u64;
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl VoiceCatalogPort for HttpTtsClient {
    async fn list_voices(&self) -> Result<Vec<VoiceInfo>, TtsError> {
        let response = self
            .client
            .get(self.voices_url())
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TtsError::ServiceError(format!("HTTP {}: {}", status, error_text)));
        }

        let voices: Vec<VoiceInfo> = response
            .json()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Invalid voice list: {}", e)))?;

        tracing::debug!(count = voices.len(), "Fetched voice list");
        Ok(voices)
    }
}
