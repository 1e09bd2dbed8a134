//! Synthesize Command Handlers
//!
//! 合成流水线编排：
//! - 不分段：单次后端调用，原样返回
//! - 分段：Segmenter → Dispatcher → Merger

use base64::Engine;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::application::commands::{SaveSynthesis, SynthesizeCommand};
use crate::application::error::SynthesisError;
use crate::application::ports::{
    AudioMergerPort, SegmentDispatcherPort, SynthesisRequest, TtsEnginePort, TtsError,
};
use crate::domain::synthesis::MergeOutcome;
use crate::domain::{chunk_text, SegmentConfig};

/// 合成输出
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub audio: Vec<u8>,
    pub content_type: String,
    /// 实际发往后端的片段数
    pub segment_count: usize,
    /// 多段合并时的摘要
    pub merge: Option<MergeOutcome>,
}

/// 写文件结果
#[derive(Debug, Clone)]
pub struct SavedAudio {
    pub path: PathBuf,
    pub size: usize,
}

/// 根据文件头推断 Content-Type
fn sniff_content_type(audio: &[u8]) -> &'static str {
    if audio.len() >= 12 && &audio[0..4] == b"RIFF" && &audio[8..12] == b"WAVE" {
        "audio/wav"
    } else {
        "audio/mpeg"
    }
}

/// SynthesizeCommand Handler
pub struct SynthesizeHandler {
    tts_engine: Arc<dyn TtsEnginePort>,
    dispatcher: Arc<dyn SegmentDispatcherPort>,
    merger: Arc<dyn AudioMergerPort>,
    /// 整体超时，None 表示不限制
    timeout: Option<Duration>,
}

impl SynthesizeHandler {
    pub fn new(
        tts_engine: Arc<dyn TtsEnginePort>,
        dispatcher: Arc<dyn SegmentDispatcherPort>,
        merger: Arc<dyn AudioMergerPort>,
    ) -> Self {
        Self {
            tts_engine,
            dispatcher,
            merger,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// 合成并返回音频字节
    pub async fn handle(&self, command: SynthesizeCommand) -> Result<Vec<u8>, SynthesisError> {
        self.synthesize(command).await.map(|output| output.audio)
    }

    /// 合成并返回 base64 编码的音频
    pub async fn handle_base64(&self, command: SynthesizeCommand) -> Result<String, SynthesisError> {
        let audio = self.handle(command).await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(audio))
    }

    /// 合成并写入文件
    pub async fn save_to_file(&self, command: SaveSynthesis) -> Result<SavedAudio, SynthesisError> {
        let audio = self.handle(command.command).await?;

        if let Some(parent) = command.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&command.path, &audio).await?;

        tracing::info!(path = %command.path.display(), size = audio.len(), "Audio saved");

        Ok(SavedAudio {
            path: command.path,
            size: audio.len(),
        })
    }

    /// 合成并返回完整输出
    pub async fn synthesize(&self, command: SynthesizeCommand) -> Result<SynthesisOutput, SynthesisError> {
        if command.text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let started = Instant::now();
        let chars = command.text.chars().count();

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_pipeline(command))
                .await
                .map_err(|_| {
                    tracing::error!(chars, timeout = ?limit, "Synthesis timed out");
                    SynthesisError::Timeout(limit)
                })??,
            None => self.run_pipeline(command).await?,
        };

        tracing::info!(
            chars,
            segments = output.segment_count,
            bytes = output.audio.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Synthesis completed"
        );

        Ok(output)
    }

    async fn run_pipeline(&self, command: SynthesizeCommand) -> Result<SynthesisOutput, SynthesisError> {
        let params = Arc::new(command.params);

        if !command.chunking_enabled {
            let request = SynthesisRequest::new(command.text, params);
            let audio = self.tts_engine.synthesize(request).await?;
            if audio.audio_data.is_empty() {
                return Err(SynthesisError::Backend(TtsError::InvalidResponse(
                    "backend returned empty audio".to_string(),
                )));
            }
            let content_type = audio
                .content_type
                .unwrap_or_else(|| sniff_content_type(&audio.audio_data).to_string());
            return Ok(SynthesisOutput {
                audio: audio.audio_data,
                content_type,
                segment_count: 1,
                merge: None,
            });
        }

        let config = SegmentConfig::new(command.chunk_size);
        let chunks = chunk_text(&command.text, &config, params);
        let total = chunks.len();
        tracing::debug!(
            segments = total,
            chunk_size = config.effective_chunk_size(),
            "Text segmented"
        );

        let results = self.dispatcher.dispatch(chunks, command.concurrency).await;
        let first_error = results.iter().find_map(|r| r.error.clone());

        let merged = self.merger.merge(results).await;
        if merged.audio.is_empty() {
            return Err(SynthesisError::AllSegmentsFailed {
                total,
                cause: first_error.unwrap_or_else(|| "backend returned empty audio".to_string()),
            });
        }

        Ok(SynthesisOutput {
            content_type: sniff_content_type(&merged.audio).to_string(),
            audio: merged.audio,
            segment_count: total,
            merge: merged.outcome,
        })
    }
}
