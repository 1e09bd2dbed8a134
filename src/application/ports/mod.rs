//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_merger;
mod segment_dispatcher;
mod tts_engine;
mod voice_catalog;

pub use audio_merger::{AudioFormat, AudioMergerPort, CodecError, MergedAudio};
pub use segment_dispatcher::{SegmentDispatcherPort, DEFAULT_CONCURRENCY};
pub use tts_engine::{SynthesisRequest, SynthesizedAudio, TtsEnginePort, TtsError};
pub use voice_catalog::{VoiceCatalogPort, VoiceInfo};
