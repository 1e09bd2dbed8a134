//! HTTP Handlers

mod ping;
mod tts;
mod voices;
mod websocket;

pub use ping::*;
pub use tts::*;
pub use voices::*;
pub use websocket::*;
