//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TtsEngine、VoiceCatalog、SegmentDispatcher、AudioMerger）
//! - commands: 合成命令及处理器
//! - queries: 音色查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

pub use commands::{
    handlers::{SavedAudio, SynthesisOutput, SynthesizeHandler},
    SaveSynthesis, SynthesizeCommand,
};

pub use error::{ApplicationError, SynthesisError};

pub use ports::{
    AudioFormat, AudioMergerPort, CodecError, MergedAudio, SegmentDispatcherPort,
    SynthesisRequest, SynthesizedAudio, TtsEnginePort, TtsError, VoiceCatalogPort, VoiceInfo,
    DEFAULT_CONCURRENCY,
};

pub use queries::{handlers::ListVoicesHandler, ListVoices};
