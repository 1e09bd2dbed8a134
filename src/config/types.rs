//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::ports::{AudioFormat, DEFAULT_CONCURRENCY};
use crate::domain::synthesis::DEFAULT_VOICE;
use crate::domain::DEFAULT_CHUNK_SIZE;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// TTS 后端配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 合成流水线配置
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// 音频合并配置
    #[serde(default)]
    pub audio: AudioConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5050
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// TTS 后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsBackend {
    /// 外部 HTTP 合成服务
    #[default]
    Http,
    /// 本地生成测试音频
    Fake,
}

/// TTS 后端配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub backend: TtsBackend,

    /// TTS 服务基础 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 单次请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 网络错误或 5xx 时的重试次数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// fake 后端的模拟延迟（毫秒）
    #[serde(default)]
    pub fake_latency_ms: u64,
}

fn default_tts_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_tts_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            backend: TtsBackend::default(),
            url: default_tts_url(),
            timeout_secs: default_tts_timeout(),
            max_retries: default_max_retries(),
            fake_latency_ms: 0,
        }
    }
}

/// 合成流水线配置，同时作为 HTTP 请求的默认值
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// 默认音色
    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// 默认是否分段
    #[serde(default)]
    pub chunking_enabled: bool,

    /// 默认片段长度（字符数）
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// 默认并发数
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// 整体超时（秒），0 表示不限制
    #[serde(default)]
    pub timeout_secs: u64,
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            default_voice: default_voice(),
            chunking_enabled: false,
            chunk_size: default_chunk_size(),
            concurrency: default_concurrency(),
            timeout_secs: 0,
        }
    }
}

impl SynthesisConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// 音频合并配置
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// 多段合并的输出格式
    /// 可选: mp3, wav
    #[serde(default)]
    pub output_format: AudioFormat,

    /// MP3 编码码率
    #[serde(default = "default_bitrate")]
    pub bitrate: String,

    /// ffmpeg 可执行文件
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// 降级拼接时未知格式跳过的字节数
    #[serde(default = "default_header_skip")]
    pub header_skip_bytes: usize,
}

fn default_bitrate() -> String {
    "128k".to_string()
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_header_skip() -> usize {
    250
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            output_format: AudioFormat::Mp3,
            bitrate: default_bitrate(),
            ffmpeg_path: default_ffmpeg_path(),
            header_skip_bytes: default_header_skip(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5050);
        assert_eq!(config.tts.backend, TtsBackend::Http);
        assert_eq!(config.synthesis.default_voice, "zh-CN-XiaoxiaoNeural");
        assert_eq!(config.synthesis.chunk_size, 500);
        assert_eq!(config.synthesis.concurrency, 3);
        assert_eq!(config.audio.output_format, AudioFormat::Mp3);
        assert_eq!(config.audio.header_skip_bytes, 250);
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:5050");
    }

    #[test]
    fn test_synthesis_timeout() {
        let mut config = SynthesisConfig::default();
        assert_eq!(config.timeout(), None);
        config.timeout_secs = 30;
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [tts]
            backend = "fake"

            [audio]
            output_format = "wav"
            "#,
        )
        .unwrap();
        assert_eq!(config.tts.backend, TtsBackend::Fake);
        assert_eq!(config.tts.url, "http://localhost:8000");
        assert_eq!(config.audio.output_format, AudioFormat::Wav);
        assert_eq!(config.audio.bitrate, "128k");
    }
}
