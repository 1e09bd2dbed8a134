//! 应用层 - 命令
//!
//! CQRS 命令侧：文本合成

mod synthesize_commands;

pub mod handlers;

pub use synthesize_commands::*;
