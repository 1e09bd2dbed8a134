//! Synthesize Commands

use std::path::PathBuf;

use crate::application::ports::DEFAULT_CONCURRENCY;
use crate::domain::synthesis::VoiceParams;
use crate::domain::DEFAULT_CHUNK_SIZE;

/// 文本转语音命令
#[derive(Debug, Clone)]
pub struct SynthesizeCommand {
    pub text: String,
    pub params: VoiceParams,
    /// 是否对长文本分段并发合成
    pub chunking_enabled: bool,
    /// 目标片段长度（字符数），低于下限时按下限处理
    pub chunk_size: usize,
    /// 同时在途的后端请求数
    pub concurrency: usize,
}

impl SynthesizeCommand {
    pub fn new(text: impl Into<String>, params: VoiceParams) -> Self {
        Self {
            text: text.into(),
            params,
            chunking_enabled: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_chunking(mut self, chunk_size: usize, concurrency: usize) -> Self {
        self.chunking_enabled = true;
        self.chunk_size = chunk_size;
        self.concurrency = concurrency;
        self
    }
}

/// 合成并写入文件
#[derive(Debug, Clone)]
pub struct SaveSynthesis {
    pub command: SynthesizeCommand,
    pub path: PathBuf,
}
