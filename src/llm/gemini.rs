//! Gemini 客户端（经 OpenAI 兼容端点）
//!
//! - Base URL: https://generativelanguage.googleapis.com/v1beta/openai/
//! - 模型: gemini-2.5-flash（默认）

use crate::llm::{LlmError, OpenAiClient};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
pub const GEMINI_FLASH: &str = "gemini-2.5-flash";

/// 读取 API Key：优先 `GEMINI_API_KEY`，其次 `API_KEY`
pub fn gemini_api_key() -> Option<String> {
    std::env::var("GEMINI_API_KEY")
        .ok()
        .or_else(|| std::env::var("API_KEY").ok())
        .filter(|k| !k.trim().is_empty())
}

/// 创建 Gemini 客户端；没有 Key 时返回 MissingApiKey（会话初始化失败）
pub fn create_gemini_client(
    model: Option<&str>,
    base_url: Option<&str>,
    timeout_secs: u64,
) -> Result<OpenAiClient, LlmError> {
    let api_key =
        gemini_api_key().ok_or_else(|| LlmError::MissingApiKey("GEMINI_API_KEY".to_string()))?;
    let model = model.unwrap_or(GEMINI_FLASH);
    Ok(OpenAiClient::new(
        Some(base_url.unwrap_or(GEMINI_BASE_URL)),
        model,
        &api_key,
        timeout_secs,
    ))
}
