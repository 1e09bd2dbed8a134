//! Segment Dispatcher Port - 分段并发合成

use async_trait::async_trait;

use crate::domain::synthesis::{Chunk, SegmentResult};

/// 默认并发数
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Segment Dispatcher Port
#[async_trait]
pub trait SegmentDispatcherPort: Send + Sync {
    /// 并发合成所有片段
    ///
    /// 返回与输入一一对应的结果，`result[i].sequence_index == chunks[i].sequence_index`；
    /// 单个片段失败不会中断其它片段
    async fn dispatch(&self, chunks: Vec<Chunk>, concurrency: usize) -> Vec<SegmentResult>;
}
