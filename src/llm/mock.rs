//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! - MockLlmClient：根据最后一条 User 消息生成带指令的固定风格回复，便于本地跑通完整流程
//! - ScriptedLlmClient：按顺序返回预设结果，并记录收到的提示，供测试断言

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, PromptMessage, PromptRole};

fn last_user_content(messages: &[PromptMessage]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == PromptRole::User)
        .map(|m| m.content.as_str())
        .unwrap_or("(no input)")
}

/// Mock 客户端：问候时给出心情选项，收到反应令牌时致谢，其余回显并附带反应与快捷回复
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, LlmError> {
        let last_user = last_user_content(messages);
        let turns = messages.iter().filter(|m| m.role == PromptRole::User).count();

        let reply = if turns <= 1 {
            "Xin chào! Mình là HoneysuckleBot (mock). Hôm nay bạn cảm thấy thế nào? \
             [EMOJI_REPLY: \"😊 Vui vẻ\", \"😢 Buồn\", \"😟 Lo lắng\", \"😐 Bình thường\"]"
                .to_string()
        } else if last_user.starts_with("[USER_REACTION:") {
            "Cảm ơn bạn nhé!".to_string()
        } else {
            format!(
                "[EMOJI_REACTION: 🤔] Mình nghe bạn nói: \"{}\". \
                 [QUICK_REPLY: \"Kể thêm nhé\", \"Mình ổn\"]",
                last_user
            )
        };
        Ok(reply)
    }
}

/// 脚本客户端：每次 complete 弹出一条预设结果；脚本用尽时返回 Request 错误
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    received: Mutex<Vec<Vec<PromptMessage>>>,
}

impl ScriptedLlmClient {
    pub fn new(replies: impl IntoIterator<Item = Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            received: Mutex::new(Vec::new()),
        }
    }

    /// 便捷构造：全部成功的回复
    pub fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| Ok(r.into())))
    }

    /// 每次调用收到的完整提示（含 system）
    pub fn received(&self) -> Vec<Vec<PromptMessage>> {
        self.received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, LlmError> {
        self.received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(messages.to_vec());
        self.replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Request("script exhausted".to_string())))
    }
}
