//! Audio Merger - 分段音频合并
//!
//! 优先解码为 PCM 后拼接再统一编码；编码链路不可用或失败时降级为字节拼接。
//! 多段合并时通过 MergeNotifier 发布 merge_start / merge_end

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use super::codec::{self, PcmEncoder};
use super::concat::{self, DEFAULT_HEADER_SKIP};
use crate::application::ports::{AudioFormat, AudioMergerPort, CodecError, MergedAudio};
use crate::domain::synthesis::{MergeOutcome, MergeStrategy, SegmentResult};
use crate::infrastructure::events::MergeNotifier;

/// 合并器配置
#[derive(Debug, Clone)]
pub struct AudioMergerConfig {
    pub output_format: AudioFormat,
    pub ffmpeg_path: PathBuf,
    /// MP3 编码码率，如 "128k"
    pub bitrate: String,
    /// 未知容器时跳过的前缀字节数
    pub header_skip_bytes: usize,
}

impl Default for AudioMergerConfig {
    fn default() -> Self {
        Self {
            output_format: AudioFormat::Mp3,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            bitrate: "128k".to_string(),
            header_skip_bytes: DEFAULT_HEADER_SKIP,
        }
    }
}

/// merge_end 守卫
///
/// 创建时发布 merge_start；`complete` 发布最终结果，
/// 未完成即被丢弃（如外层超时取消）时补发失败的 merge_end
struct MergeEventGuard {
    notifier: Arc<MergeNotifier>,
    started: Instant,
    completed: bool,
}

impl MergeEventGuard {
    fn start(notifier: Arc<MergeNotifier>, segment_count: usize) -> Self {
        notifier.publish_merge_start(segment_count);
        Self {
            notifier,
            started: Instant::now(),
            completed: false,
        }
    }

    /// 发布 merge_end，返回合并耗时（秒）
    fn complete(mut self, success: bool, output_bytes: usize) -> f64 {
        self.completed = true;
        let duration_secs = self.started.elapsed().as_secs_f64();
        self.notifier
            .publish_merge_end(duration_secs, success, output_bytes);
        duration_secs
    }
}

impl Drop for MergeEventGuard {
    fn drop(&mut self) {
        if !self.completed {
            let duration_secs = self.started.elapsed().as_secs_f64();
            tracing::warn!(
                elapsed_secs = duration_secs,
                "Merge cancelled before completion"
            );
            self.notifier.publish_merge_end(duration_secs, false, 0);
        }
    }
}

/// 分段音频合并器
pub struct AudioMerger {
    notifier: Arc<MergeNotifier>,
    encoder: PcmEncoder,
    header_skip_bytes: usize,
}

impl AudioMerger {
    /// 创建合并器，`ffmpeg_available` 为启动时的探测结果
    pub fn new(
        config: AudioMergerConfig,
        ffmpeg_available: bool,
        notifier: Arc<MergeNotifier>,
    ) -> Self {
        if config.output_format == AudioFormat::Mp3 && !ffmpeg_available {
            tracing::warn!(
                path = %config.ffmpeg_path.display(),
                "ffmpeg unavailable, multi-segment MP3 merges will use byte concatenation"
            );
        }

        Self {
            notifier,
            encoder: PcmEncoder::new(
                config.output_format,
                config.ffmpeg_path,
                ffmpeg_available,
                config.bitrate,
            ),
            header_skip_bytes: config.header_skip_bytes,
        }
    }

    /// 探测 ffmpeg 后创建合并器
    pub async fn probe(config: AudioMergerConfig, notifier: Arc<MergeNotifier>) -> Self {
        let available = codec::probe_ffmpeg(&config.ffmpeg_path).await;
        Self::new(config, available, notifier)
    }

    /// 解码-拼接-编码
    async fn merge_with_codec(&self, segments: Arc<[Vec<u8>]>) -> Result<Vec<u8>, CodecError> {
        if !self.encoder.is_available() {
            return Err(CodecError::ToolchainUnavailable(format!(
                "no encoder for {}",
                self.encoder.format()
            )));
        }

        let pcm = codec::run_blocking(move || codec::decode_and_concat(&segments)).await?;
        tracing::debug!(
            sample_rate = pcm.sample_rate,
            channels = pcm.channels,
            duration_ms = pcm.duration_ms(),
            "Segments decoded"
        );

        self.encoder.encode(pcm).await
    }

    fn finish(
        &self,
        guard: MergeEventGuard,
        audio: Vec<u8>,
        segment_count: usize,
        dropped_segments: usize,
        strategy: MergeStrategy,
    ) -> MergedAudio {
        let success = !audio.is_empty();
        let output_bytes = audio.len();
        let duration_secs = guard.complete(success, output_bytes);

        tracing::info!(
            segments = segment_count,
            dropped = dropped_segments,
            bytes = output_bytes,
            success,
            strategy = ?strategy,
            "Merge finished in {:.2}s",
            duration_secs
        );

        MergedAudio {
            audio,
            outcome: Some(MergeOutcome {
                duration_secs,
                success,
                output_bytes,
                segment_count,
                dropped_segments,
                strategy,
            }),
        }
    }
}

#[async_trait]
impl AudioMergerPort for AudioMerger {
    async fn merge(&self, mut results: Vec<SegmentResult>) -> MergedAudio {
        results.sort_by_key(|r| r.sequence_index);

        // 零段或单段直接返回，不发布事件
        if results.len() <= 1 {
            let audio = results
                .into_iter()
                .next()
                .filter(|r| r.ok)
                .map(|r| r.audio)
                .unwrap_or_default();
            return MergedAudio::passthrough(audio);
        }

        let segment_count = results.len();
        let guard = MergeEventGuard::start(self.notifier.clone(), segment_count);

        let (usable, rejected): (Vec<_>, Vec<_>) =
            results.into_iter().partition(|r| r.is_usable());
        let mut dropped = rejected.len();

        if dropped > 0 {
            let indices: Vec<usize> = rejected.iter().map(|r| r.sequence_index).collect();
            tracing::warn!(dropped, ?indices, "Excluding failed or empty segments from merge");
        }

        if usable.is_empty() {
            return self.finish(guard, Vec::new(), segment_count, dropped, MergeStrategy::None);
        }

        let usable: Arc<[Vec<u8>]> = usable.into_iter().map(|r| r.audio).collect();

        match self.merge_with_codec(usable.clone()).await {
            Ok(audio) => self.finish(guard, audio, segment_count, dropped, MergeStrategy::Codec),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Codec merge unavailable, falling back to byte concatenation (degraded)"
                );
                let segments: Vec<&[u8]> = usable.iter().map(Vec::as_slice).collect();
                let output = concat::concat_segments(&segments, self.header_skip_bytes);
                dropped += output.skipped;
                self.finish(
                    guard,
                    output.audio,
                    segment_count,
                    dropped,
                    MergeStrategy::ByteConcat,
                )
            }
        }
    }

    fn output_format(&self) -> AudioFormat {
        self.encoder.format()
    }
}
