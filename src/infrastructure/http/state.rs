//! Application State
//!
//! 包含所有 Command/Query Handlers 与请求默认值

use std::sync::Arc;

use crate::application::{ListVoicesHandler, SynthesizeHandler};
use crate::config::SynthesisConfig;
use crate::infrastructure::events::MergeNotifier;

/// 应用状态
pub struct AppState {
    pub synthesize_handler: SynthesizeHandler,
    pub list_voices_handler: ListVoicesHandler,
    /// 合并事件，WebSocket 订阅其广播流
    pub notifier: Arc<MergeNotifier>,
    /// 请求未指定时使用的默认参数
    pub defaults: SynthesisConfig,
}

impl AppState {
    pub fn new(
        synthesize_handler: SynthesizeHandler,
        list_voices_handler: ListVoicesHandler,
        notifier: Arc<MergeNotifier>,
        defaults: SynthesisConfig,
    ) -> Self {
        Self {
            synthesize_handler,
            list_voices_handler,
            notifier,
            defaults,
        }
    }
}
