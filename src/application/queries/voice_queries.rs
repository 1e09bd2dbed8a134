//! Voice Queries

/// 列出可用音色
#[derive(Debug, Clone, Default)]
pub struct ListVoices {
    /// 按语言区域过滤，如 "zh-CN"；不区分大小写
    pub locale: Option<String>,
}
