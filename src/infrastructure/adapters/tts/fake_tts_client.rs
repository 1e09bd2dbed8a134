//! Fake TTS Client - 用于测试和离线运行的 TTS 客户端
//!
//! 不调用外部服务，按文本生成确定性的 WAV 音频

use async_trait::async_trait;
use std::time::Duration;

use crate::application::ports::{
    SynthesisRequest, SynthesizedAudio, TtsEnginePort, TtsError, VoiceCatalogPort, VoiceInfo,
};
use crate::infrastructure::adapters::merger::wav;

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 输出采样率
    pub sample_rate: u32,
    /// 每个字符对应的音频时长（毫秒）
    pub ms_per_char: u32,
    /// 模拟合成延迟（毫秒）
    pub latency_ms: u64,
    /// 文本包含该标记时返回错误
    pub fail_marker: Option<String>,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            ms_per_char: 20,
            latency_ms: 0,
            fail_marker: None,
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        tracing::info!(
            sample_rate = config.sample_rate,
            latency_ms = config.latency_ms,
            "FakeTtsClient initialized"
        );
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }

    /// 生成与文本对应的音频：时长与字符数成正比，音高由文本哈希决定
    pub fn render(&self, text: &str) -> Vec<u8> {
        let chars = text.chars().count() as u64;
        let frames = (self.config.sample_rate as u64 * chars * self.config.ms_per_char as u64
            / 1000) as usize;

        let seed = text
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        let period = 20 + (seed % 60) as usize;

        // 锯齿波
        let samples: Vec<i16> = (0..frames)
            .map(|i| ((i % period) as i32 * 8000 / period as i32 - 4000) as i16)
            .collect();

        wav::encode_pcm16(&samples, self.config.sample_rate, 1)
    }
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, TtsError> {
        tracing::debug!(
            chars = request.text.chars().count(),
            voice = %request.params.voice_id(),
            "FakeTtsClient: rendering audio"
        );

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        if let Some(marker) = &self.config.fail_marker {
            if request.text.contains(marker.as_str()) {
                return Err(TtsError::ServiceError(format!(
                    "fake backend rejected text containing {:?}",
                    marker
                )));
            }
        }

        Ok(SynthesizedAudio {
            audio_data: self.render(&request.text),
            content_type: Some("audio/wav".to_string()),
        })
    }
}

#[async_trait]
impl VoiceCatalogPort for FakeTtsClient {
    async fn list_voices(&self) -> Result<Vec<VoiceInfo>, TtsError> {
        let voices = [
            ("zh-CN-XiaoxiaoNeural", "zh-CN", "晓晓", "Female"),
            ("zh-CN-YunxiNeural", "zh-CN", "云希", "Male"),
            ("en-US-AriaNeural", "en-US", "Aria", "Female"),
            ("en-US-GuyNeural", "en-US", "Guy", "Male"),
        ];

        Ok(voices
            .iter()
            .map(|(short_name, locale, local_name, gender)| VoiceInfo {
                short_name: short_name.to_string(),
                locale: locale.to_string(),
                local_name: local_name.to_string(),
                gender: gender.to_string(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::synthesis::VoiceParams;
    use std::sync::Arc;

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest::new(text, Arc::new(VoiceParams::default()))
    }

    #[tokio::test]
    async fn test_renders_wav_proportional_to_text() {
        let client = FakeTtsClient::with_defaults();
        let audio = client.synthesize(request("你好世界。")).await.unwrap();

        let header = wav::parse_wav_header(&audio.audio_data).unwrap();
        assert_eq!(header.fmt.sample_rate, 16000);
        assert_eq!(header.duration_ms(), 100);
        assert_eq!(audio.content_type.as_deref(), Some("audio/wav"));
    }

    #[tokio::test]
    async fn test_deterministic() {
        let client = FakeTtsClient::with_defaults();
        let a = client.synthesize(request("same text")).await.unwrap();
        let b = client.synthesize(request("same text")).await.unwrap();
        assert_eq!(a.audio_data, b.audio_data);
    }

    #[tokio::test]
    async fn test_fail_marker() {
        let client = FakeTtsClient::new(FakeTtsClientConfig {
            fail_marker: Some("#fail".to_string()),
            ..Default::default()
        });
        assert!(client.synthesize(request("ok")).await.is_ok());
        assert!(matches!(
            client.synthesize(request("bad #fail")).await,
            Err(TtsError::ServiceError(_))
        ));
    }

    #[tokio::test]
    async fn test_voice_list() {
        let voices = FakeTtsClient::with_defaults().list_voices().await.unwrap();
        assert_eq!(voices.len(), 4);
        assert!(voices.iter().any(|v| v.short_name == "zh-CN-XiaoxiaoNeural"));
    }
}
