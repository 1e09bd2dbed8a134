//! 字节级拼接（降级合并）
//!
//! 第一段完整保留，后续片段去掉容器头后直接追加：
//! - RIFF/WAVE: 只取 data chunk 负载，最后修正长度字段
//! - MPEG: 跳过 ID3v2 标签，定位到第一个有效帧头，去掉尾部 ID3v1 标签
//! - 未知格式: 跳过固定长度前缀

use super::wav;

/// 未知格式时跳过的默认前缀长度
pub const DEFAULT_HEADER_SKIP: usize = 250;

const ID3V1_LEN: usize = 128;

/// 片段容器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Wav,
    Mpeg,
    Unknown,
}

impl Container {
    pub fn detect(data: &[u8]) -> Self {
        if wav::is_wav(data) {
            Container::Wav
        } else if data.starts_with(b"ID3") || is_frame_header(data, 0) {
            Container::Mpeg
        } else {
            Container::Unknown
        }
    }
}

/// 拼接结果
#[derive(Debug, Default)]
pub struct ConcatOutput {
    pub audio: Vec<u8>,
    /// 因无法去头而被跳过的片段数
    pub skipped: usize,
}

/// MPEG 音频帧头校验
fn is_frame_header(data: &[u8], pos: usize) -> bool {
    if pos + 4 > data.len() {
        return false;
    }
    let (b0, b1, b2) = (data[pos], data[pos + 1], data[pos + 2]);
    if b0 != 0xFF || b1 & 0xE0 != 0xE0 {
        return false;
    }
    let version = (b1 >> 3) & 0x03;
    let layer = (b1 >> 1) & 0x03;
    let bitrate = b2 >> 4;
    let sample_rate = (b2 >> 2) & 0x03;
    version != 0x01 && layer != 0x00 && bitrate != 0x0F && bitrate != 0x00 && sample_rate != 0x03
}

/// ID3v2 标签总长度（含头），没有标签时为 0
fn id3v2_len(data: &[u8]) -> usize {
    if data.len() < 10 || !data.starts_with(b"ID3") {
        return 0;
    }
    // syncsafe 整数，每字节 7 位
    let size = data[6..10]
        .iter()
        .fold(0usize, |acc, &b| (acc << 7) | (b & 0x7F) as usize);
    let footer = if data[5] & 0x10 != 0 { 10 } else { 0 };
    (10 + size + footer).min(data.len())
}

/// 去掉尾部 ID3v1 标签
fn strip_id3v1(data: &[u8]) -> &[u8] {
    if data.len() >= ID3V1_LEN && &data[data.len() - ID3V1_LEN..data.len() - ID3V1_LEN + 3] == b"TAG"
    {
        &data[..data.len() - ID3V1_LEN]
    } else {
        data
    }
}

/// MPEG 片段的帧数据部分
fn mpeg_frames(data: &[u8]) -> Option<&[u8]> {
    let start = id3v2_len(data);
    let body = strip_id3v1(data);
    if start >= body.len() {
        return None;
    }
    let offset = (start..body.len()).find(|&pos| is_frame_header(body, pos))?;
    Some(&body[offset..])
}

/// WAV 片段的 PCM 负载
fn wav_payload(data: &[u8]) -> Option<&[u8]> {
    let header = wav::parse_wav_header(data).ok()?;
    Some(&data[header.data_start..header.data_start + header.data_size])
}

/// 按容器类型去头拼接
pub fn concat_segments(segments: &[&[u8]], header_skip: usize) -> ConcatOutput {
    let mut output = ConcatOutput::default();
    let Some((first, rest)) = segments.split_first() else {
        return output;
    };

    let container = Container::detect(first);
    // WAV 时记录 data 长度字段的偏移，拼接后修正
    let mut wav_size_offset = None;

    match container {
        Container::Wav => match wav::parse_wav_header(first) {
            Ok(header) => {
                output
                    .audio
                    .extend_from_slice(&first[..header.data_start + header.data_size]);
                wav_size_offset = Some(header.data_start - 4);
            }
            Err(e) => {
                tracing::warn!(error = %e, "First segment has a broken WAV header, keeping raw bytes");
                output.audio.extend_from_slice(first);
            }
        },
        Container::Mpeg => output.audio.extend_from_slice(strip_id3v1(first)),
        Container::Unknown => output.audio.extend_from_slice(first),
    }

    for (position, segment) in rest.iter().enumerate() {
        let payload = match container {
            Container::Wav => wav_payload(segment),
            Container::Mpeg => mpeg_frames(segment),
            Container::Unknown => None,
        };

        match payload {
            Some(payload) => output.audio.extend_from_slice(payload),
            None if segment.len() > header_skip => {
                if container != Container::Unknown {
                    tracing::warn!(
                        segment = position + 1,
                        "Segment container not recognized, skipping fixed header"
                    );
                }
                output.audio.extend_from_slice(&segment[header_skip..]);
            }
            None => {
                tracing::warn!(
                    segment = position + 1,
                    bytes = segment.len(),
                    header_skip,
                    "Segment shorter than header, skipped"
                );
                output.skipped += 1;
            }
        }
    }

    if let Some(offset) = wav_size_offset {
        wav::patch_sizes(&mut output.audio, offset);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mp3_frame() -> Vec<u8> {
        // MPEG-1 Layer III, 128kbps, 44.1kHz
        let mut frame = vec![0xFF, 0xFB, 0x90, 0x64];
        frame.extend(std::iter::repeat(0x55).take(413));
        frame
    }

    fn id3v2(payload_len: usize) -> Vec<u8> {
        let mut tag = b"ID3\x04\x00\x00".to_vec();
        let size = payload_len as u32;
        tag.extend_from_slice(&[
            ((size >> 21) & 0x7F) as u8,
            ((size >> 14) & 0x7F) as u8,
            ((size >> 7) & 0x7F) as u8,
            (size & 0x7F) as u8,
        ]);
        tag.extend(std::iter::repeat(0u8).take(payload_len));
        tag
    }

    fn id3v1() -> Vec<u8> {
        let mut tag = b"TAG".to_vec();
        tag.extend(std::iter::repeat(b' ').take(ID3V1_LEN - 3));
        tag
    }

    #[test]
    fn test_detect_container() {
        assert_eq!(Container::detect(&wav::encode_pcm16(&[0; 4], 8000, 1)), Container::Wav);
        assert_eq!(Container::detect(&id3v2(10)), Container::Mpeg);
        assert_eq!(Container::detect(&mp3_frame()), Container::Mpeg);
        assert_eq!(Container::detect(b"OggS0000"), Container::Unknown);
    }

    #[test]
    fn test_unknown_skips_fixed_prefix() {
        let a = vec![1u8; 300];
        let b = vec![2u8; 300];
        let c = vec![3u8; 300];
        let out = concat_segments(&[&a, &b, &c], DEFAULT_HEADER_SKIP);

        assert_eq!(out.audio.len(), 300 + 50 + 50);
        assert_eq!(out.skipped, 0);
        assert!(out.audio[..300].iter().all(|&x| x == 1));
        assert!(out.audio[300..350].iter().all(|&x| x == 2));
    }

    #[test]
    fn test_short_unknown_segment_is_skipped() {
        let a = vec![1u8; 300];
        let short = vec![2u8; 250];
        let out = concat_segments(&[&a, &short], DEFAULT_HEADER_SKIP);

        assert_eq!(out.audio, a);
        assert_eq!(out.skipped, 1);
    }

    #[test]
    fn test_wav_payloads_and_sizes() {
        let a = wav::encode_pcm16(&[1; 100], 8000, 1);
        let b = wav::encode_pcm16(&[2; 50], 8000, 1);
        let out = concat_segments(&[&a, &b], DEFAULT_HEADER_SKIP);

        assert_eq!(out.audio.len(), 44 + 300);
        let header = wav::parse_wav_header(&out.audio).unwrap();
        assert_eq!(header.data_size, 300);
        assert_eq!(
            u32::from_le_bytes([out.audio[4], out.audio[5], out.audio[6], out.audio[7]]) as usize,
            out.audio.len() - 8
        );
        // 第二段只留下 PCM 负载
        assert_eq!(&out.audio[244..246], &2i16.to_le_bytes());
    }

    #[test]
    fn test_mpeg_tags_removed() {
        let frame = mp3_frame();
        let a = [id3v2(20), frame.clone(), id3v1()].concat();
        let b = [id3v2(33), vec![0u8; 7], frame.clone(), id3v1()].concat();
        let out = concat_segments(&[&a, &b], DEFAULT_HEADER_SKIP);

        let expected = [id3v2(20), frame.clone(), frame].concat();
        assert_eq!(out.audio, expected);
        assert_eq!(out.skipped, 0);
    }

    #[test]
    fn test_mpeg_without_frame_falls_back_to_skip() {
        let a = mp3_frame();
        let b = [id3v2(10), vec![0u8; 400]].concat();
        let out = concat_segments(&[&a, &b], DEFAULT_HEADER_SKIP);

        assert_eq!(out.audio.len(), a.len() + b.len() - DEFAULT_HEADER_SKIP);
    }

    #[test]
    fn test_empty_input() {
        let out = concat_segments(&[], DEFAULT_HEADER_SKIP);
        assert!(out.audio.is_empty());
    }
}
