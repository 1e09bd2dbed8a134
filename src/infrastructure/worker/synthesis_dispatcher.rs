//! Synthesis Dispatcher - 分段并发合成

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::application::ports::{SegmentDispatcherPort, SynthesisRequest, TtsEnginePort};
use crate::domain::synthesis::{Chunk, SegmentResult};

/// 分段合成调度器
///
/// 用 semaphore 限制同时在途的后端调用数，结果按输入下标收集
pub struct SynthesisDispatcher {
    tts_engine: Arc<dyn TtsEnginePort>,
}

impl SynthesisDispatcher {
    pub fn new(tts_engine: Arc<dyn TtsEnginePort>) -> Self {
        Self { tts_engine }
    }

    /// 合成单个片段，后端错误转换为失败结果
    async fn synthesize_one(tts_engine: Arc<dyn TtsEnginePort>, chunk: Chunk) -> SegmentResult {
        let index = chunk.sequence_index;
        let chars = chunk.text.chars().count();
        let started = Instant::now();

        let request = SynthesisRequest::new(chunk.text, chunk.params);
        match tts_engine.synthesize(request).await {
            Ok(audio) => {
                tracing::debug!(
                    segment = index,
                    chars,
                    bytes = audio.audio_data.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Segment synthesized"
                );
                SegmentResult::success(index, audio.audio_data)
            }
            Err(e) => {
                tracing::warn!(segment = index, chars, error = %e, "Segment synthesis failed");
                SegmentResult::failure(index, e.to_string())
            }
        }
    }
}

#[async_trait]
impl SegmentDispatcherPort for SynthesisDispatcher {
    async fn dispatch(&self, chunks: Vec<Chunk>, concurrency: usize) -> Vec<SegmentResult> {
        if chunks.is_empty() {
            return Vec::new();
        }

        let total = chunks.len();
        // permit 数不超过片段数
        let limit = concurrency.clamp(1, total);
        tracing::info!(segments = total, concurrency = limit, "Dispatching segments");

        let semaphore = Arc::new(Semaphore::new(limit));
        let mut handles = Vec::with_capacity(total);

        for chunk in chunks {
            let index = chunk.sequence_index;
            let semaphore = semaphore.clone();
            let tts_engine = self.tts_engine.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit, // 持有 permit 直到合成完成
                    Err(_) => return SegmentResult::failure(index, "Dispatcher semaphore closed"),
                };
                Self::synthesize_one(tts_engine, chunk).await
            });
            handles.push((index, handle));
        }

        // 按提交顺序等待，输出顺序与输入一致
        let mut results = Vec::with_capacity(total);
        for (index, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(segment = index, error = %e, "Segment task aborted");
                    SegmentResult::failure(index, format!("Segment task aborted: {}", e))
                }
            };
            results.push(result);
        }

        let failed = results.iter().filter(|r| !r.ok).count();
        tracing::info!(segments = total, failed, "Dispatch completed");

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{SynthesizedAudio, TtsError};
    use crate::domain::synthesis::VoiceParams;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 按文本决定行为的测试后端
    struct ScriptedEngine {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedEngine {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TtsEnginePort for ScriptedEngine {
        async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, TtsError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            // 文本格式 "<delay_ms>:<payload>"
            let (delay, payload) = request.text.split_once(':').unwrap_or(("0", request.text.as_str()));
            let delay: u64 = delay.parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match payload {
                "fail" => Err(TtsError::ServiceError("scripted failure".to_string())),
                "panic" => panic!("scripted panic"),
                other => Ok(SynthesizedAudio {
                    audio_data: other.as_bytes().to_vec(),
                    content_type: None,
                }),
            }
        }
    }

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        let params = Arc::new(VoiceParams::default());
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk {
                sequence_index: i,
                text: t.to_string(),
                params: params.clone(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let engine = ScriptedEngine::new();
        let dispatcher = SynthesisDispatcher::new(engine);

        // 先提交的片段最慢完成
        let results = dispatcher
            .dispatch(chunks(&["60:a", "40:b", "20:c", "0:d"]), 4)
            .await;

        let indices: Vec<_> = results.iter().map(|r| r.sequence_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        let payloads: Vec<_> = results.iter().map(|r| r.audio.clone()).collect();
        assert_eq!(payloads, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let engine = ScriptedEngine::new();
        let dispatcher = SynthesisDispatcher::new(engine.clone());

        let texts: Vec<String> = (0..10).map(|i| format!("20:{}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        let results = dispatcher.dispatch(chunks(&refs), 3).await;

        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|r| r.ok));
        let peak = engine.max_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight {} exceeded limit", peak);
        assert!(peak >= 2);
    }

    #[tokio::test]
    async fn test_failure_does_not_cancel_siblings() {
        let engine = ScriptedEngine::new();
        let dispatcher = SynthesisDispatcher::new(engine);

        let results = dispatcher
            .dispatch(chunks(&["10:a", "0:fail", "10:c", "0:panic"]), 2)
            .await;

        assert_eq!(results.len(), 4);
        assert!(results[0].ok);
        assert!(!results[1].ok);
        assert!(results[1].audio.is_empty());
        assert!(results[1].error.as_deref().unwrap().contains("scripted failure"));
        assert!(results[2].ok);
        assert!(!results[3].ok);
        assert_eq!(results[3].sequence_index, 3);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped() {
        let engine = ScriptedEngine::new();
        let dispatcher = SynthesisDispatcher::new(engine.clone());

        let results = dispatcher.dispatch(chunks(&["0:a", "0:b"]), 0).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.ok));
        assert_eq!(engine.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oversized_concurrency_is_clamped() {
        let engine = ScriptedEngine::new();
        let dispatcher = SynthesisDispatcher::new(engine.clone());

        let results = dispatcher
            .dispatch(chunks(&["5:a", "5:b", "5:c"]), usize::MAX)
            .await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.ok));
        assert!(engine.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let dispatcher = SynthesisDispatcher::new(ScriptedEngine::new());
        assert!(dispatcher.dispatch(Vec::new(), 3).await.is_empty());
    }
}
