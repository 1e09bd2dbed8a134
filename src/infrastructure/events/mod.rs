//! Events - 合并事件通知

mod notifier;

pub use notifier::{
    HandlerError, MergeChannel, MergeEvent, MergeHandler, MergeNotifier, SubscriptionId,
};
