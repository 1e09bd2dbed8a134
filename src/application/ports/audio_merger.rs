//! Audio Merger Port - 分段音频合并抽象
//!
//! 定义将多个片段音频合并为单一音频流的接口

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::synthesis::{MergeOutcome, SegmentResult};

/// 编解码错误
///
/// 只在高保真合并路径内部出现，触发降级而不会返回给调用方
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Toolchain unavailable: {0}")]
    ToolchainUnavailable(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::IoError(err.to_string())
    }
}

/// 合并后的输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MP3 - 与后端输出一致，需要 ffmpeg 编码
    #[default]
    Mp3,
    /// 16 位 PCM WAV，内置编码
    Wav,
}

impl AudioFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "wav" => Ok(AudioFormat::Wav),
            _ => Err(CodecError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// 合并结果
#[derive(Debug, Clone)]
pub struct MergedAudio {
    /// 合并后的音频，失败时为空
    pub audio: Vec<u8>,
    /// 多段合并时的结果摘要；零段或单段直通时为 None
    pub outcome: Option<MergeOutcome>,
}

impl MergedAudio {
    pub fn passthrough(audio: Vec<u8>) -> Self {
        Self {
            audio,
            outcome: None,
        }
    }
}

/// Audio Merger Port
#[async_trait]
pub trait AudioMergerPort: Send + Sync {
    /// 按 sequence_index 顺序合并片段音频
    async fn merge(&self, results: Vec<SegmentResult>) -> MergedAudio;

    /// 合并输出格式
    fn output_format(&self) -> AudioFormat;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse_and_display() {
        assert_eq!("MP3".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert_eq!("wav".parse::<AudioFormat>().unwrap(), AudioFormat::Wav);
        assert!("opus".parse::<AudioFormat>().is_err());
        assert_eq!(AudioFormat::Wav.to_string(), "wav");
        assert_eq!(AudioFormat::Mp3.content_type(), "audio/mpeg");
    }
}
