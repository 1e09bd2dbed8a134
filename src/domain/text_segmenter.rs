//! 文本分割器
//!
//! 将长文本按句末标点切分为适合单次合成的片段，片段长度尽量贴近目标长度

use std::sync::Arc;

use super::synthesis::{Chunk, VoiceParams};

/// 目标片段长度下限，避免过度切分
pub const MIN_CHUNK_SIZE: usize = 500;

/// 默认目标片段长度
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// 最小可分割长度的上限
const MIN_VIABLE_CAP: usize = 200;

/// 文本分割配置
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// 目标片段字符数
    pub chunk_size: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SegmentConfig {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// 实际使用的目标长度（不低于 MIN_CHUNK_SIZE）
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(MIN_CHUNK_SIZE)
    }

    /// 最小可分割长度: min(200, chunk_size / 5)
    fn min_viable(&self) -> usize {
        MIN_VIABLE_CAP.min(self.effective_chunk_size() / 5)
    }
}

/// 检查是否为句末标点（中英文）
#[inline]
fn is_sentence_end(ch: char) -> bool {
    matches!(ch, '。' | '！' | '？' | '；' | '.' | '!' | '?' | ';')
}

/// 对文本进行分段
///
/// 分段策略：
/// 1. 文本长度不足目标长度的 1.5 倍时不分段
/// 2. 只在句末标点处考虑分割
/// 3. 当前片段同时满足最小可分割长度和目标长度的 80% 时才分割
/// 4. 剩余内容作为最后一段
///
/// 长度按字符计，不做 trim，所有片段拼接后与原文完全一致
pub fn segment_text(text: &str, config: &SegmentConfig) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let chunk_size = config.effective_chunk_size();
    let total_chars = text.chars().count();

    // total < chunk_size * 1.5
    if total_chars.saturating_mul(2) < chunk_size.saturating_mul(3) {
        return vec![text.to_string()];
    }

    let min_viable = config.min_viable();
    let split_at = chunk_size.saturating_mul(4);
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut char_count = 0;

    for ch in text.chars() {
        current.push(ch);
        char_count += 1;

        // char_count >= chunk_size * 0.8
        if is_sentence_end(ch) && char_count >= min_viable && char_count * 5 >= split_at {
            segments.push(std::mem::take(&mut current));
            char_count = 0;
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

/// 分段并编号，生成流水线使用的 Chunk
pub fn chunk_text(text: &str, config: &SegmentConfig, params: Arc<VoiceParams>) -> Vec<Chunk> {
    segment_text(text, config)
        .into_iter()
        .enumerate()
        .map(|(sequence_index, text)| Chunk {
            sequence_index,
            text,
            params: params.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 生成 count 个长度为 len 的英文句子
    fn sentences(count: usize, len: usize) -> String {
        let body = "a".repeat(len - 1);
        (0..count).map(|_| format!("{}.", body)).collect()
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(segment_text("", &SegmentConfig::default()).is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let segments = segment_text("A. B. C.", &SegmentConfig::new(500));
        assert_eq!(segments, vec!["A. B. C.".to_string()]);
    }

    #[test]
    fn test_below_threshold_is_single_chunk() {
        // 749 < 500 * 1.5
        let text = sentences(7, 107);
        assert_eq!(text.chars().count(), 749);
        let segments = segment_text(&text, &SegmentConfig::new(500));
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0], text);
    }

    #[test]
    fn test_long_text_splits_near_target() {
        let text = sentences(40, 50);
        assert_eq!(text.chars().count(), 2000);

        let segments = segment_text(&text, &SegmentConfig::new(500));
        assert!((3..=5).contains(&segments.len()), "got {} chunks", segments.len());
        for seg in &segments {
            assert!(seg.chars().count() >= 400, "chunk too short: {}", seg.chars().count());
        }
        assert_eq!(segments.concat(), text);
    }

    #[test]
    fn test_no_terminal_punctuation_is_single_chunk() {
        let text = "字".repeat(3000);
        let segments = segment_text(&text, &SegmentConfig::new(500));
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0], text);
    }

    #[test]
    fn test_chunk_size_is_floored() {
        let config = SegmentConfig::new(10);
        assert_eq!(config.effective_chunk_size(), MIN_CHUNK_SIZE);

        let text = sentences(16, 50);
        let segments = segment_text(&text, &config);
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.chars().count() == 400));
    }

    #[test]
    fn test_huge_chunk_size_keeps_text_whole() {
        let text = sentences(40, 50);
        assert_eq!(segment_text(&text, &SegmentConfig::new(usize::MAX / 2)), vec![text.clone()]);
        assert_eq!(segment_text(&text, &SegmentConfig::new(usize::MAX)), vec![text]);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        // 每句 100 个中文字符（含句号），共 10 句
        let sentence = format!("{}。", "中".repeat(99));
        let text = sentence.repeat(10);

        let segments = segment_text(&text, &SegmentConfig::new(500));
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].chars().count(), 400);
        assert_eq!(segments[1].chars().count(), 400);
        assert_eq!(segments[2].chars().count(), 200);
        assert_eq!(segments.concat(), text);
    }

    #[test]
    fn test_mixed_terminators_reconstruct_input() {
        let parts = ["你好世界！", "How are you? ", "很好；", "Fine; ", "再见。", "Bye. "];
        let text: String = parts.iter().cycle().take(300).copied().collect();

        let segments = segment_text(&text, &SegmentConfig::new(600));
        assert!(segments.len() > 1);
        assert_eq!(segments.concat(), text);
    }

    #[test]
    fn test_chunk_text_numbers_in_order() {
        let text = sentences(40, 50);
        let params = Arc::new(VoiceParams::default());
        let chunks = chunk_text(&text, &SegmentConfig::default(), params);

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sequence_index, i);
        }
    }
}
