//! 应用层错误定义
//!
//! - SynthesisError: 合成流水线的失败类型
//! - ApplicationError: 统一的命令/查询错误类型

use std::time::Duration;
use thiserror::Error;

use crate::application::ports::TtsError;
use crate::domain::synthesis::ParamError;

/// 合成流水线错误
///
/// 单个片段失败和高保真合并不可用都在流水线内部消化，不会出现在这里
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// 输入文本为空，未发起任何合成
    #[error("Text is empty")]
    EmptyText,

    /// 音色参数非法
    #[error("Invalid parameter: {0}")]
    InvalidParameter(#[from] ParamError),

    /// 所有片段都失败，没有可合并的音频
    #[error("All {total} segments failed to synthesize: {cause}")]
    AllSegmentsFailed { total: usize, cause: String },

    /// 不分段时后端调用失败
    #[error("Backend error: {0}")]
    Backend(#[from] TtsError),

    /// 整体超时（分段合成 + 合并）
    #[error("Synthesis timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 外部服务错误
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    /// 存储错误
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<SynthesisError> for ApplicationError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::EmptyText | SynthesisError::InvalidParameter(_) => {
                Self::ValidationError(err.to_string())
            }
            SynthesisError::AllSegmentsFailed { .. }
            | SynthesisError::Backend(_)
            | SynthesisError::Timeout(_) => Self::ExternalServiceError(err.to_string()),
            SynthesisError::Io(_) => Self::StorageError(err.to_string()),
        }
    }
}

impl From<TtsError> for ApplicationError {
    fn from(err: TtsError) -> Self {
        Self::ExternalServiceError(err.to_string())
    }
}

impl From<ParamError> for ApplicationError {
    fn from(err: ParamError) -> Self {
        Self::ValidationError(err.to_string())
    }
}
