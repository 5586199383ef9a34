//! 聊天会话：固定 system 指令 + 最近 N 轮提示历史
//!
//! 把无状态的 LlmClient 包装成「持久会话」：send_message 只需传本轮文本。
//! 成功的往返才写入历史，失败不留痕迹。

use std::sync::Arc;

use crate::llm::{LlmClient, LlmError, PromptMessage};

pub struct ChatSession {
    llm: Arc<dyn LlmClient>,
    system_instruction: String,
    history: Vec<PromptMessage>,
    max_turns: usize,
}

impl ChatSession {
    pub fn new(llm: Arc<dyn LlmClient>, system_instruction: impl Into<String>, max_turns: usize) -> Self {
        Self {
            llm,
            system_instruction: system_instruction.into(),
            history: Vec::new(),
            max_turns: max_turns.max(1),
        }
    }

    pub fn backend(&self) -> &str {
        self.llm.name()
    }

    pub fn history(&self) -> &[PromptMessage] {
        &self.history
    }

    pub async fn send_message(&mut self, text: &str) -> Result<String, LlmError> {
        let mut prompt = Vec::with_capacity(self.history.len() + 2);
        prompt.push(PromptMessage::system(self.system_instruction.clone()));
        prompt.extend(self.history.iter().cloned());
        prompt.push(PromptMessage::user(text));

        let reply = self.llm.complete(&prompt).await?;

        self.history.push(PromptMessage::user(text));
        self.history.push(PromptMessage::assistant(reply.clone()));
        self.prune();
        Ok(reply)
    }

    /// 每轮 user + assistant 两条；超出 max_turns*2 时丢弃最旧的
    fn prune(&mut self) {
        let keep = self.max_turns * 2;
        if self.history.len() > keep {
            self.history.drain(..self.history.len() - keep);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{PromptRole, ScriptedLlmClient};

    #[tokio::test]
    async fn test_system_instruction_leads_every_prompt() {
        let client = Arc::new(ScriptedLlmClient::replies(["a", "b"]));
        let mut session = ChatSession::new(client.clone(), "be kind", 10);
        session.send_message("hi").await.unwrap();
        session.send_message("again").await.unwrap();

        let received = client.received();
        assert_eq!(received[1][0], PromptMessage::system("be kind"));
        assert_eq!(received[1].len(), 4);
        assert_eq!(received[1][3], PromptMessage::user("again"));
    }

    #[tokio::test]
    async fn test_failed_send_leaves_history_untouched() {
        let client = Arc::new(ScriptedLlmClient::new(vec![
            Ok("ok".to_string()),
            Err(LlmError::Request("boom".to_string())),
        ]));
        let mut session = ChatSession::new(client, "sys", 10);
        session.send_message("one").await.unwrap();
        assert!(session.send_message("two").await.is_err());
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[1].role, PromptRole::Assistant);
    }

    #[tokio::test]
    async fn test_history_is_pruned() {
        let client = Arc::new(ScriptedLlmClient::replies(["1", "2", "3"]));
        let mut session = ChatSession::new(client, "sys", 2);
        for text in ["a", "b", "c"] {
            session.send_message(text).await.unwrap();
        }
        assert_eq!(session.history().len(), 4);
        assert_eq!(session.history()[0], PromptMessage::user("b"));
    }
}
