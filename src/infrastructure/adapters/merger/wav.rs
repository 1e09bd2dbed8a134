//! RIFF/WAVE 容器解析与 16 位 PCM 编码

use crate::application::ports::CodecError;

/// WAV 头信息
#[derive(Debug, Clone)]
pub struct WavHeader {
    pub fmt: FmtChunk,
    /// data chunk 负载起始偏移
    pub data_start: usize,
    /// data chunk 负载长度（已按实际文件长度截断）
    pub data_size: usize,
}

#[derive(Debug, Clone)]
pub struct FmtChunk {
    #[allow(dead_code)]
    pub audio_format: u16,
    pub num_channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl WavHeader {
    /// 时长（毫秒）
    pub fn duration_ms(&self) -> u64 {
        let bytes_per_frame =
            (self.fmt.bits_per_sample as usize / 8) * self.fmt.num_channels as usize;
        if bytes_per_frame == 0 || self.fmt.sample_rate == 0 {
            return 0;
        }
        (self.data_size / bytes_per_frame) as u64 * 1000 / self.fmt.sample_rate as u64
    }
}

/// 是否为 RIFF/WAVE 数据
pub fn is_wav(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE"
}

fn read_u16(data: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([data[pos], data[pos + 1]])
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// 解析 WAV 文件头
pub fn parse_wav_header(data: &[u8]) -> Result<WavHeader, CodecError> {
    if data.len() < 44 {
        return Err(CodecError::InvalidInput("WAV data too short".to_string()));
    }

    if !is_wav(data) {
        return Err(CodecError::InvalidInput(
            "Invalid WAV: missing RIFF/WAVE header".to_string(),
        ));
    }

    let mut pos = 12;
    let mut fmt_chunk: Option<FmtChunk> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32(data, pos + 4) as usize;

        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 || pos + 8 + 16 > data.len() {
                    return Err(CodecError::InvalidInput("Invalid fmt chunk size".to_string()));
                }
                let base = pos + 8;
                fmt_chunk = Some(FmtChunk {
                    audio_format: read_u16(data, base),
                    num_channels: read_u16(data, base + 2),
                    sample_rate: read_u32(data, base + 4),
                    bits_per_sample: read_u16(data, base + 14),
                });
            }
            b"data" => {
                let fmt = fmt_chunk.ok_or_else(|| {
                    CodecError::InvalidInput("Invalid WAV: missing fmt chunk".to_string())
                })?;
                let data_start = pos + 8;
                // 流式输出的 WAV 可能声明了错误的长度，以实际数据为准
                let data_size = chunk_size.min(data.len() - data_start);
                return Ok(WavHeader {
                    fmt,
                    data_start,
                    data_size,
                });
            }
            _ => {}
        }

        pos += 8 + chunk_size;
        // 对齐到偶数字节
        if chunk_size % 2 != 0 {
            pos += 1;
        }
    }

    Err(CodecError::InvalidInput(
        "Invalid WAV: missing data chunk".to_string(),
    ))
}

/// 将 16 位 PCM 样本编码为 WAV
pub fn encode_pcm16(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample / 8) as u32;
    let block_align = channels * (bits_per_sample / 8);

    let data_size = samples.len() * 2;
    let file_size = 36 + data_size;

    let mut wav = Vec::with_capacity(44 + data_size);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(file_size as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data_size as u32).to_le_bytes());

    for sample in samples {
        wav.extend_from_slice(&sample.to_le_bytes());
    }

    wav
}

/// f32 样本转 16 位整数
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect()
}

/// 修正拼接后 WAV 的 RIFF 长度和 data 长度字段
pub fn patch_sizes(wav: &mut [u8], data_size_offset: usize) {
    let riff_size = (wav.len() - 8) as u32;
    wav[4..8].copy_from_slice(&riff_size.to_le_bytes());

    let data_size = (wav.len() - data_size_offset - 4) as u32;
    wav[data_size_offset..data_size_offset + 4].copy_from_slice(&data_size.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_then_parse_header() {
        let samples = vec![0i16; 16000];
        let wav = encode_pcm16(&samples, 16000, 1);

        let header = parse_wav_header(&wav).unwrap();
        assert_eq!(header.fmt.sample_rate, 16000);
        assert_eq!(header.fmt.num_channels, 1);
        assert_eq!(header.fmt.bits_per_sample, 16);
        assert_eq!(header.data_start, 44);
        assert_eq!(header.data_size, 32000);
        assert_eq!(header.duration_ms(), 1000);
    }

    #[test]
    fn test_rejects_non_wav() {
        assert!(parse_wav_header(&[0u8; 100]).is_err());
        assert!(parse_wav_header(b"RIFF").is_err());
        assert!(!is_wav(b"ID3\x04\x00\x00\x00\x00\x00\x00"));
    }

    #[test]
    fn test_skips_unknown_chunks() {
        let mut wav = encode_pcm16(&[1, 2, 3, 4], 8000, 1);
        // 在 fmt 和 data 之间插入一个奇数长度的 LIST chunk
        let list = [b"LIST".as_slice(), &3u32.to_le_bytes(), b"abc", &[0u8]].concat();
        wav.splice(36..36, list.iter().copied());

        let header = parse_wav_header(&wav).unwrap();
        assert_eq!(header.data_start, 36 + list.len() + 8);
        assert_eq!(header.data_size, 8);
    }

    #[test]
    fn test_patch_sizes() {
        let mut wav = encode_pcm16(&[0; 10], 8000, 1);
        wav.extend_from_slice(&[0u8; 20]);
        patch_sizes(&mut wav, 40);

        let header = parse_wav_header(&wav).unwrap();
        assert_eq!(header.data_size, 40);
        assert_eq!(read_u32(&wav, 4) as usize, wav.len() - 8);
    }
}
