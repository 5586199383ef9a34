//! LLM 客户端抽象
//!
//! 所有后端（Gemini / OpenAI 兼容 / Mock）实现 LlmClient：把提示消息列表补全为一段回复文本。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::PromptMessage;

/// 远端调用失败；对轮次控制器而言一律视为传输失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("API key missing: set {0}")]
    MissingApiKey(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Response contained no choices")]
    EmptyChoices,
}

/// LLM 客户端 trait：非流式补全
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, LlmError>;

    /// 后端名称（日志用）
    fn name(&self) -> &str {
        "llm"
    }
}
