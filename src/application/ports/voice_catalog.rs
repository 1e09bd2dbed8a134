//! Voice Catalog Port - 可用音色列表

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::TtsError;

/// 音色信息
///
/// 字段名与上游音色列表保持一致（PascalCase）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    #[serde(rename = "ShortName")]
    pub short_name: String,
    #[serde(rename = "Locale")]
    pub locale: String,
    #[serde(rename = "LocalName", default)]
    pub local_name: String,
    #[serde(rename = "Gender")]
    pub gender: String,
}

/// Voice Catalog Port
#[async_trait]
pub trait VoiceCatalogPort: Send + Sync {
    /// 获取所有可用音色
    async fn list_voices(&self) -> Result<Vec<VoiceInfo>, TtsError>;
}
