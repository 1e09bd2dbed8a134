//! Synthesis Context - Entities
//!
//! 单次合成流水线内部流转的实体，每次调用新建，返回结果后即丢弃

use serde::Serialize;
use std::sync::Arc;

use super::VoiceParams;

/// 文本片段，对应一次后端合成调用
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 合并顺序，等于分段时的发出顺序
    pub sequence_index: usize,
    pub text: String,
    /// 同一次请求的所有片段共享参数
    pub params: Arc<VoiceParams>,
}

/// 单个片段的合成结果
#[derive(Debug, Clone)]
pub struct SegmentResult {
    pub sequence_index: usize,
    /// 失败时为空
    pub audio: Vec<u8>,
    pub ok: bool,
    pub error: Option<String>,
}

impl SegmentResult {
    pub fn success(sequence_index: usize, audio: Vec<u8>) -> Self {
        Self {
            sequence_index,
            audio,
            ok: true,
            error: None,
        }
    }

    pub fn failure(sequence_index: usize, error: impl Into<String>) -> Self {
        Self {
            sequence_index,
            audio: Vec::new(),
            ok: false,
            error: Some(error.into()),
        }
    }

    /// 可参与合并：成功且音频非空
    pub fn is_usable(&self) -> bool {
        self.ok && !self.audio.is_empty()
    }
}

/// 合并策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// 解码为 PCM 后拼接，再统一编码
    Codec,
    /// 直接拼接压缩字节流
    ByteConcat,
    /// 没有可合并的片段
    None,
}

/// 一次合并的结果摘要
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub duration_secs: f64,
    pub success: bool,
    pub output_bytes: usize,
    pub segment_count: usize,
    /// 因失败或为空而被排除的片段数
    pub dropped_segments: usize,
    pub strategy: MergeStrategy,
}
