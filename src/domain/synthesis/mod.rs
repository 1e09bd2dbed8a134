//! Synthesis Context - 语音合成限界上下文
//!
//! 职责:
//! - 音色参数（语速、音量、音调）校验
//! - 分段 / 合成结果 / 合并结果实体

mod entities;
mod errors;
mod value_objects;

pub use entities::{Chunk, MergeOutcome, MergeStrategy, SegmentResult};
pub use errors::ParamError;
pub use value_objects::{ProsodyUnit, ProsodyValue, VoiceParams, DEFAULT_VOICE, PROSODY_LIMIT};
