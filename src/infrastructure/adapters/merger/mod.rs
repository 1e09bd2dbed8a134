//! Audio Merger Adapter
//!
//! 分段音频合并：symphonia 解码 + 内置 WAV / ffmpeg MP3 编码，失败时字节拼接

mod audio_merger;
mod codec;
mod concat;
pub(crate) mod wav;

pub use audio_merger::{AudioMerger, AudioMergerConfig};
pub use codec::probe_ffmpeg;
pub use concat::DEFAULT_HEADER_SKIP;
