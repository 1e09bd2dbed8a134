//! Worker Layer - 分段并发合成
//!
//! 实现 SynthesisDispatcher，受限并发地调用 TTS 后端

mod synthesis_dispatcher;

pub use synthesis_dispatcher::SynthesisDispatcher;
