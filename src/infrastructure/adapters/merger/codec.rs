//! PCM 解码、重采样与编码
//!
//! 解码使用 symphonia（WAV / MP3），WAV 内置编码，MP3 通过外部 ffmpeg 编码

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use super::wav;
use crate::application::ports::{AudioFormat, CodecError};

/// 解码后的交错 PCM
#[derive(Debug, Clone)]
pub struct PcmAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmAudio {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / (self.sample_rate as u64 * self.channels as u64)
    }
}

/// 解码任意受支持的容器为 PCM
pub fn decode_to_pcm(data: &[u8]) -> Result<PcmAudio, CodecError> {
    let cursor = Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    if wav::is_wav(data) {
        hint.with_extension("wav");
    } else {
        hint.with_extension("mp3");
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| CodecError::DecodingError(format!("Probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| CodecError::DecodingError("No audio track found".to_string()))?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| CodecError::DecodingError(format!("Decoder creation failed: {}", e)))?;

    let track_id = track.id;
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                return Err(CodecError::DecodingError(format!("Packet read error: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(error = %e, "Decode error, skipping packet");
                continue;
            }
            Err(e) => {
                return Err(CodecError::DecodingError(format!("Decode failed: {}", e)));
            }
        };

        let spec = *decoded.spec();
        // MP3 的采样率和声道数可能只在第一帧里出现
        if sample_rate == 0 {
            sample_rate = spec.rate;
        }
        if channels == 0 {
            channels = spec.channels.count() as u16;
        }

        let num_frames = decoded.frames();
        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        let actual_samples = num_frames * spec.channels.count();
        samples.extend(&sample_buf.samples()[..actual_samples]);
    }

    if sample_rate == 0 || channels == 0 {
        return Err(CodecError::DecodingError(
            "Unknown sample rate or channel count".to_string(),
        ));
    }

    Ok(PcmAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// 线性插值重采样
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32, channels: u16) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || channels == 0 {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let channel_count = channels as usize;
    let frame_count = samples.len() / channel_count;
    if frame_count == 0 {
        return Vec::new();
    }
    let new_frame_count = (frame_count as f64 * ratio) as usize;
    let mut resampled = Vec::with_capacity(new_frame_count * channel_count);

    for i in 0..new_frame_count {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        for ch in 0..channel_count {
            let idx0 = src_idx * channel_count + ch;
            let idx1 = (src_idx + 1).min(frame_count - 1) * channel_count + ch;

            let s0 = samples.get(idx0).copied().unwrap_or(0.0);
            let s1 = samples.get(idx1).copied().unwrap_or(s0);
            resampled.push(s0 + (s1 - s0) * frac);
        }
    }

    resampled
}

/// 声道数转换（单声道 <-> 多声道）
pub fn remix(samples: &[f32], from_channels: u16, to_channels: u16) -> Vec<f32> {
    if from_channels == to_channels || from_channels == 0 || to_channels == 0 {
        return samples.to_vec();
    }

    let from = from_channels as usize;
    let to = to_channels as usize;
    let mut out = Vec::with_capacity(samples.len() / from * to);
    for frame in samples.chunks_exact(from) {
        let mono = frame.iter().sum::<f32>() / from as f32;
        out.extend(std::iter::repeat(mono).take(to));
    }
    out
}

/// 将多段 PCM 拼接为一段，参数以第一段为准
pub fn concat_pcm(parts: Vec<PcmAudio>) -> Option<PcmAudio> {
    let mut iter = parts.into_iter();
    let mut merged = iter.next()?;

    for part in iter {
        let mut samples = remix(&part.samples, part.channels, merged.channels);
        if part.sample_rate != merged.sample_rate {
            tracing::debug!(
                from = part.sample_rate,
                to = merged.sample_rate,
                "Resampling segment"
            );
            samples = resample(&samples, part.sample_rate, merged.sample_rate, merged.channels);
        }
        merged.samples.extend(samples);
    }

    Some(merged)
}

/// 解码全部片段并拼接为一段 PCM
pub fn decode_and_concat(segments: &[Vec<u8>]) -> Result<PcmAudio, CodecError> {
    let parts = segments
        .iter()
        .map(|segment| decode_to_pcm(segment))
        .collect::<Result<Vec<_>, _>>()?;
    concat_pcm(parts).ok_or_else(|| CodecError::InvalidInput("no segments to merge".to_string()))
}

/// 在阻塞线程池上执行解码、转换等 CPU 密集任务
pub async fn run_blocking<T, F>(task: F) -> Result<T, CodecError>
where
    F: FnOnce() -> Result<T, CodecError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| CodecError::EncodingError(format!("audio task failed: {}", e)))?
}

/// PCM 编码器
///
/// WAV 总是可用；MP3 需要 ffmpeg
#[derive(Debug, Clone)]
pub struct PcmEncoder {
    format: AudioFormat,
    ffmpeg_path: PathBuf,
    ffmpeg_available: bool,
    bitrate: String,
}

impl PcmEncoder {
    pub fn new(
        format: AudioFormat,
        ffmpeg_path: impl Into<PathBuf>,
        ffmpeg_available: bool,
        bitrate: impl Into<String>,
    ) -> Self {
        Self {
            format,
            ffmpeg_path: ffmpeg_path.into(),
            ffmpeg_available,
            bitrate: bitrate.into(),
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// 是否可以走解码-拼接-编码路径
    pub fn is_available(&self) -> bool {
        match self.format {
            AudioFormat::Wav => true,
            AudioFormat::Mp3 => self.ffmpeg_available,
        }
    }

    pub async fn encode(&self, pcm: PcmAudio) -> Result<Vec<u8>, CodecError> {
        match self.format {
            AudioFormat::Wav => {
                run_blocking(move || {
                    Ok(wav::encode_pcm16(
                        &wav::f32_to_i16(&pcm.samples),
                        pcm.sample_rate,
                        pcm.channels,
                    ))
                })
                .await
            }
            AudioFormat::Mp3 => {
                if !self.ffmpeg_available {
                    return Err(CodecError::ToolchainUnavailable(format!(
                        "ffmpeg not found at {}",
                        self.ffmpeg_path.display()
                    )));
                }
                self.encode_mp3(pcm).await
            }
        }
    }

    /// 通过 ffmpeg 将 s16le PCM 编码为 MP3
    async fn encode_mp3(&self, pcm: PcmAudio) -> Result<Vec<u8>, CodecError> {
        let (sample_rate, channels) = (pcm.sample_rate, pcm.channels);
        let raw = run_blocking(move || {
            let mut raw = Vec::with_capacity(pcm.samples.len() * 2);
            for sample in wav::f32_to_i16(&pcm.samples) {
                raw.extend_from_slice(&sample.to_le_bytes());
            }
            Ok(raw)
        })
        .await?;

        let mut child = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error", "-f", "s16le", "-ar"])
            .arg(sample_rate.to_string())
            .arg("-ac")
            .arg(channels.to_string())
            .args(["-i", "pipe:0", "-codec:a", "libmp3lame", "-b:a"])
            .arg(&self.bitrate)
            .args(["-f", "mp3", "pipe:1"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CodecError::EncodingError("ffmpeg stdin unavailable".to_string()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CodecError::EncodingError("ffmpeg stdout unavailable".to_string()))?;

        // 写入和读取必须并发，否则管道缓冲区写满后会死锁
        let writer = async move {
            stdin.write_all(&raw).await?;
            stdin.shutdown().await?;
            drop(stdin);
            Ok::<_, std::io::Error>(())
        };
        let reader = async move {
            let mut encoded = Vec::new();
            stdout.read_to_end(&mut encoded).await?;
            Ok::<_, std::io::Error>(encoded)
        };

        let (written, encoded) = tokio::join!(writer, reader);
        let output = child.wait_with_output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CodecError::EncodingError(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        written?;
        let encoded = encoded?;
        if encoded.is_empty() {
            return Err(CodecError::EncodingError("ffmpeg produced no output".to_string()));
        }

        Ok(encoded)
    }
}

/// 启动时探测 ffmpeg 是否可用
pub async fn probe_ffmpeg(ffmpeg_path: &Path) -> bool {
    let status = Command::new(ffmpeg_path)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(s) if s.success() => {
            tracing::info!(path = %ffmpeg_path.display(), "ffmpeg available");
            true
        }
        Ok(s) => {
            tracing::warn!(path = %ffmpeg_path.display(), status = %s, "ffmpeg probe failed");
            false
        }
        Err(e) => {
            tracing::warn!(path = %ffmpeg_path.display(), error = %e, "ffmpeg not found");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(sample_rate: u32, millis: u32) -> Vec<u8> {
        let frames = (sample_rate * millis / 1000) as usize;
        let samples: Vec<i16> = (0..frames).map(|i| ((i % 64) as i16 - 32) * 256).collect();
        wav::encode_pcm16(&samples, sample_rate, 1)
    }

    #[test]
    fn test_decode_wav() {
        let pcm = decode_to_pcm(&tone(16000, 500)).unwrap();
        assert_eq!(pcm.sample_rate, 16000);
        assert_eq!(pcm.channels, 1);
        assert_eq!(pcm.samples.len(), 8000);
        assert_eq!(pcm.duration_ms(), 500);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_to_pcm(&[0x42u8; 600]).is_err());
    }

    #[test]
    fn test_resample_halves_length() {
        let samples: Vec<f32> = (0..1000).map(|i| i as f32 / 1000.0).collect();
        let out = resample(&samples, 16000, 8000, 1);
        assert_eq!(out.len(), 500);
        assert!((out[100] - samples[200]).abs() < 1e-6);
    }

    #[test]
    fn test_remix_stereo_to_mono() {
        let out = remix(&[0.2, 0.4, -1.0, 1.0], 2, 1);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.3).abs() < 1e-6);
        assert!(out[1].abs() < 1e-6);
    }

    #[test]
    fn test_concat_uses_first_segment_rate() {
        let a = decode_to_pcm(&tone(16000, 1000)).unwrap();
        let b = decode_to_pcm(&tone(8000, 1000)).unwrap();
        let merged = concat_pcm(vec![a, b]).unwrap();
        assert_eq!(merged.sample_rate, 16000);
        assert_eq!(merged.duration_ms(), 2000);
    }

    #[test]
    fn test_decode_and_concat() {
        let merged = decode_and_concat(&[tone(8000, 250), tone(8000, 500)]).unwrap();
        assert_eq!(merged.duration_ms(), 750);
        assert!(decode_and_concat(&[tone(8000, 250), vec![0x42u8; 600]]).is_err());
        assert!(matches!(decode_and_concat(&[]), Err(CodecError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_wav_encoder_always_available() {
        let encoder = PcmEncoder::new(AudioFormat::Wav, "ffmpeg", false, "128k");
        assert!(encoder.is_available());

        let pcm = decode_to_pcm(&tone(8000, 250)).unwrap();
        let out = encoder.encode(pcm).await.unwrap();
        let header = wav::parse_wav_header(&out).unwrap();
        assert_eq!(header.duration_ms(), 250);
    }

    #[tokio::test]
    async fn test_mp3_without_ffmpeg_is_unavailable() {
        let encoder = PcmEncoder::new(AudioFormat::Mp3, "/nonexistent/ffmpeg", false, "128k");
        assert!(!encoder.is_available());

        let pcm = decode_to_pcm(&tone(8000, 100)).unwrap();
        let err = encoder.encode(pcm).await.unwrap_err();
        assert!(matches!(err, CodecError::ToolchainUnavailable(_)));
    }

    #[tokio::test]
    async fn test_probe_missing_binary() {
        assert!(!probe_ffmpeg(Path::new("/nonexistent/ffmpeg-binary")).await);
    }
}
