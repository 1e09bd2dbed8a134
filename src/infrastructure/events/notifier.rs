//! Merge Event Notifier
//!
//! 合并开始/结束事件的发布订阅注册表
//!
//! - 同步回调：按注册顺序调用，单个回调失败或 panic 只记录日志
//! - 异步订阅：所有事件同时广播到 broadcast 通道（WebSocket 推送）
//!
//! 注册表在进程（或 runner）内共享，注册只增不减，除非调用方显式 unsubscribe

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// 事件通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeChannel {
    MergeStart,
    MergeEnd,
}

impl MergeChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeChannel::MergeStart => "merge_start",
            MergeChannel::MergeEnd => "merge_end",
        }
    }
}

/// 合并事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum MergeEvent {
    /// 开始合并
    MergeStart { segment_count: usize },
    /// 合并结束（成功或失败都会发出）
    MergeEnd {
        duration_secs: f64,
        success: bool,
        output_bytes: usize,
    },
}

impl MergeEvent {
    pub fn channel(&self) -> MergeChannel {
        match self {
            MergeEvent::MergeStart { .. } => MergeChannel::MergeStart,
            MergeEvent::MergeEnd { .. } => MergeChannel::MergeEnd,
        }
    }
}

/// 回调返回的错误
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// 事件回调
pub type MergeHandler = Arc<dyn Fn(&MergeEvent) -> Result<(), HandlerError> + Send + Sync>;

/// 订阅标识，用于取消订阅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// 合并事件通知器
pub struct MergeNotifier {
    /// channel -> 按注册顺序排列的回调
    handlers: DashMap<MergeChannel, Vec<(SubscriptionId, MergeHandler)>>,
    next_id: AtomicU64,
    /// 异步订阅者的广播通道
    stream: broadcast::Sender<MergeEvent>,
}

impl MergeNotifier {
    pub fn new() -> Self {
        let (stream, _) = broadcast::channel(100);
        Self {
            handlers: DashMap::new(),
            next_id: AtomicU64::new(1),
            stream,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 注册回调
    pub fn subscribe<F>(&self, channel: MergeChannel, handler: F) -> SubscriptionId
    where
        F: Fn(&MergeEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .entry(channel)
            .or_default()
            .push((id, Arc::new(handler)));

        tracing::debug!(channel = channel.as_str(), subscription = id.0, "Merge handler registered");
        id
    }

    /// 注册合并开始回调，参数为片段数
    pub fn on_merge_start<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(usize) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.subscribe(MergeChannel::MergeStart, move |event| match event {
            MergeEvent::MergeStart { segment_count } => handler(*segment_count),
            _ => Ok(()),
        })
    }

    /// 注册合并结束回调，参数为 (耗时秒, 是否成功, 输出字节数)
    pub fn on_merge_end<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(f64, bool, usize) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.subscribe(MergeChannel::MergeEnd, move |event| match event {
            MergeEvent::MergeEnd {
                duration_secs,
                success,
                output_bytes,
            } => handler(*duration_secs, *success, *output_bytes),
            _ => Ok(()),
        })
    }

    /// 取消订阅，返回是否找到
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut removed = false;
        for mut entry in self.handlers.iter_mut() {
            let before = entry.len();
            entry.retain(|(sid, _)| *sid != id);
            removed |= entry.len() != before;
        }
        removed
    }

    /// 某通道当前的回调数量
    pub fn subscriber_count(&self, channel: MergeChannel) -> usize {
        self.handlers.get(&channel).map(|h| h.len()).unwrap_or(0)
    }

    /// 订阅事件流（异步消费者）
    pub fn subscribe_stream(&self) -> broadcast::Receiver<MergeEvent> {
        self.stream.subscribe()
    }

    /// 发布事件
    ///
    /// 同步调用该通道的所有回调，返回失败的回调数量
    pub fn publish(&self, event: MergeEvent) -> usize {
        let channel = event.channel();

        // 先复制出回调列表再调用，回调内部可以再次注册
        let handlers: Vec<MergeHandler> = self
            .handlers
            .get(&channel)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        let mut failures = 0;
        for (position, handler) in handlers.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::error!(
                        channel = channel.as_str(),
                        handler = position,
                        error = %e,
                        "Merge event handler failed"
                    );
                }
                Err(panic) => {
                    failures += 1;
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(
                        channel = channel.as_str(),
                        handler = position,
                        error = %message,
                        "Merge event handler panicked"
                    );
                }
            }
        }

        if let Err(e) = self.stream.send(event) {
            tracing::trace!(
                channel = channel.as_str(),
                error = %e,
                "No stream subscribers for merge event"
            );
        }

        failures
    }

    /// 发布合并开始事件
    pub fn publish_merge_start(&self, segment_count: usize) -> usize {
        self.publish(MergeEvent::MergeStart { segment_count })
    }

    /// 发布合并结束事件
    pub fn publish_merge_end(&self, duration_secs: f64, success: bool, output_bytes: usize) -> usize {
        self.publish(MergeEvent::MergeEnd {
            duration_secs,
            success,
            output_bytes,
        })
    }
}

impl Default for MergeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_handlers_called_in_registration_order() {
        let notifier = MergeNotifier::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let calls = calls.clone();
            notifier.on_merge_start(move |count| {
                calls.lock().unwrap().push(format!("{}:{}", tag, count));
                Ok(())
            });
        }

        let failures = notifier.publish_merge_start(4);
        assert_eq!(failures, 0);
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["first:4", "second:4", "third:4"]
        );
    }

    #[test]
    fn test_failing_handler_does_not_block_siblings() {
        let notifier = MergeNotifier::new();
        let reached = Arc::new(Mutex::new(false));

        notifier.on_merge_end(|_, _, _| Err(HandlerError::new("listener broke")));
        notifier.on_merge_end(|_, _, _| panic!("listener panicked"));
        let flag = reached.clone();
        notifier.on_merge_end(move |_, success, bytes| {
            assert!(success);
            assert_eq!(bytes, 1024);
            *flag.lock().unwrap() = true;
            Ok(())
        });

        let failures = notifier.publish_merge_end(0.5, true, 1024);
        assert_eq!(failures, 2);
        assert!(*reached.lock().unwrap());
    }

    #[test]
    fn test_channels_are_isolated() {
        let notifier = MergeNotifier::new();
        let starts = Arc::new(Mutex::new(0));
        let counter = starts.clone();
        notifier.on_merge_start(move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        notifier.publish_merge_end(0.1, false, 0);
        assert_eq!(*starts.lock().unwrap(), 0);
        assert_eq!(notifier.subscriber_count(MergeChannel::MergeStart), 1);
        assert_eq!(notifier.subscriber_count(MergeChannel::MergeEnd), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let notifier = MergeNotifier::new();
        let id = notifier.on_merge_start(|_| Ok(()));
        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        assert_eq!(notifier.subscriber_count(MergeChannel::MergeStart), 0);
    }

    #[test]
    fn test_handler_may_register_during_publish() {
        let notifier = Arc::new(MergeNotifier::new());
        let inner = notifier.clone();
        notifier.on_merge_start(move |_| {
            inner.on_merge_end(|_, _, _| Ok(()));
            Ok(())
        });

        notifier.publish_merge_start(2);
        assert_eq!(notifier.subscriber_count(MergeChannel::MergeEnd), 1);
    }

    #[tokio::test]
    async fn test_stream_receives_events() {
        let notifier = MergeNotifier::new();
        let mut rx = notifier.subscribe_stream();

        notifier.publish_merge_start(3);
        notifier.publish_merge_end(1.25, true, 2048);

        assert_eq!(rx.recv().await.unwrap(), MergeEvent::MergeStart { segment_count: 3 });
        assert_eq!(
            rx.recv().await.unwrap(),
            MergeEvent::MergeEnd {
                duration_secs: 1.25,
                success: true,
                output_bytes: 2048
            }
        );
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&MergeEvent::MergeStart { segment_count: 2 }).unwrap();
        assert_eq!(json, r#"{"event":"merge_start","data":{"segment_count":2}}"#);
    }

    #[test]
    fn test_concurrent_registration() {
        let notifier = Arc::new(MergeNotifier::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let notifier = notifier.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        notifier.on_merge_start(|_| Ok(()));
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(notifier.subscriber_count(MergeChannel::MergeStart), 400);
    }
}
