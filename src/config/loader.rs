//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, TtsBackend};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "TTSWEAVE";

/// 加载应用配置
///
/// # 环境变量示例
/// - `TTSWEAVE_SERVER__PORT=8080`
/// - `TTSWEAVE_TTS__URL=http://tts-server:8000`
/// - `TTSWEAVE_SYNTHESIS__CHUNKING_ENABLED=true`
/// - `TTSWEAVE_AUDIO__OUTPUT_FORMAT=wav`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// `config_path` 为 None 时搜索工作目录下的 config.toml / config.local.toml
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5050)?
        .set_default("tts.backend", "http")?
        .set_default("tts.url", "http://localhost:8000")?
        .set_default("tts.timeout_secs", 60)?
        .set_default("tts.max_retries", 2)?
        .set_default("tts.fake_latency_ms", 0)?
        .set_default("synthesis.default_voice", "zh-CN-XiaoxiaoNeural")?
        .set_default("synthesis.chunking_enabled", false)?
        .set_default("synthesis.chunk_size", 500)?
        .set_default("synthesis.concurrency", 3)?
        .set_default("synthesis.timeout_secs", 0)?
        .set_default("audio.output_format", "mp3")?
        .set_default("audio.bitrate", "128k")?
        .set_default("audio.ffmpeg_path", "ffmpeg")?
        .set_default("audio.header_skip_bytes", 250)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量，层级分隔符为双下划线
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.tts.backend == TtsBackend::Http && config.tts.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "TTS URL cannot be empty".to_string(),
        ));
    }

    if config.synthesis.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "Synthesis concurrency cannot be 0".to_string(),
        ));
    }

    if config.synthesis.chunk_size == 0 {
        return Err(ConfigError::ValidationError(
            "Chunk size cannot be 0".to_string(),
        ));
    }

    if config.synthesis.default_voice.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Default voice cannot be empty".to_string(),
        ));
    }

    if config.audio.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "ffmpeg path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("TTS Backend: {:?}", config.tts.backend);
    if config.tts.backend == TtsBackend::Http {
        tracing::info!("TTS URL: {}", config.tts.url);
        tracing::info!("TTS Timeout: {}s", config.tts.timeout_secs);
        tracing::info!("TTS Max Retries: {}", config.tts.max_retries);
    }
    tracing::info!("Default Voice: {}", config.synthesis.default_voice);
    tracing::info!("Chunking Enabled: {}", config.synthesis.chunking_enabled);
    tracing::info!("Chunk Size: {}", config.synthesis.chunk_size);
    tracing::info!("Concurrency: {}", config.synthesis.concurrency);
    if config.synthesis.timeout_secs > 0 {
        tracing::info!("Synthesis Timeout: {}s", config.synthesis.timeout_secs);
    }
    tracing::info!("Output Format: {}", config.audio.output_format);
    tracing::info!("ffmpeg: {}", config.audio.ffmpeg_path.display());
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
