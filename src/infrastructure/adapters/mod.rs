//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod merger;
pub mod tts;

pub use merger::{probe_ffmpeg, AudioMerger, AudioMergerConfig};
pub use tts::*;
