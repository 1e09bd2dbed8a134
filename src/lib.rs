//! ttsweave - 长文本语音合成服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Synthesis Context: 音色参数、片段、合成结果、合并结果
//! - 文本分段器
//!
//! 应用层 (application/):
//! - Ports: TtsEngine, VoiceCatalog, SegmentDispatcher, AudioMerger
//! - Commands: 合成流水线编排
//! - Queries: 音色列表
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + WebSocket
//! - Worker: 分段并发合成
//! - Adapters: TTS Client, Audio Merger
//! - Events: 合并事件通知

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
