//! 会话错误类型
//!
//! 初始化失败对会话是致命的（输入永久禁用）；传输失败只影响当前轮次；
//! 存储与序列化错误来自归档/提醒持久化，由调用方决定如何提示。

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum ChatError {
    /// 远端会话无法建立
    #[error("Session initialization failed: {0}")]
    Init(String),

    #[error("Transport failure: {0}")]
    Transport(#[from] LlmError),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid reminder time (expected HH:MM): {0}")]
    InvalidReminder(String),
}

/// 轮次请求被拒绝的原因；都不是错误，只是无操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRejection {
    /// 没有远端会话（初始化失败）
    NotInitialized,
    /// 已有轮次在进行中
    Busy,
    /// 文本输入 trim 后为空
    EmptyInput,
    /// 开场问候尚未开始，文本与反应轮次不可用
    NotGreeted,
    /// 开场问候已触发过
    AlreadyGreeted,
    /// 反应目标越界、不是模型消息或已反应过
    ReactionNotApplicable,
}
