//! Synthesis Context - Errors

use thiserror::Error;

/// 音色参数校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("音色不能为空")]
    EmptyVoice,

    #[error("无法解析的参数: {0}")]
    Malformed(String),

    #[error("参数超出范围: {value}（允许 -{limit} 到 +{limit}）")]
    OutOfRange { value: String, limit: i32 },

    #[error("{field} 参数单位错误: {value}")]
    WrongUnit { field: &'static str, value: String },
}
