//! Domain Layer - 领域层
//!
//! - Synthesis Context: 音色参数与合成流水线实体
//! - 文本分割器

pub mod synthesis;

mod text_segmenter;

pub use text_segmenter::{chunk_text, segment_text, SegmentConfig, DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE};
