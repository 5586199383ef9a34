//! 会话状态：消息序列、当前心情选项/快捷回复、greeted 与 busy
//!
//! 纯内存记账，不做任何网络或存储 I/O；由轮次控制器与反应处理器在互斥下修改。

use crate::conversation::{Message, Role};
use crate::protocol::EmojiOption;

#[derive(Clone, Debug, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    emoji_options: Vec<EmojiOption>,
    quick_replies: Vec<String>,
    greeted: bool,
    busy: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn emoji_options(&self) -> &[EmojiOption] {
        &self.emoji_options
    }

    pub fn quick_replies(&self) -> &[String] {
        &self.quick_replies
    }

    pub fn is_greeted(&self) -> bool {
        self.greeted
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn append_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// 从尾部向前找最近一条用户消息并写入反应；找不到或已有反应时静默丢弃
    pub fn set_reaction_on_last_user_message(&mut self, emoji: &str) -> bool {
        match self.messages.iter_mut().rev().find(|m| m.role() == Role::User) {
            Some(message) => message.set_reaction(emoji),
            None => {
                tracing::debug!(emoji, "no user message to attach reaction to");
                false
            }
        }
    }

    /// 越界、非模型消息或已有反应时为无操作
    pub fn set_user_reaction_on_message(&mut self, index: usize, emoji: &str) -> bool {
        self.messages
            .get_mut(index)
            .map(|m| m.set_user_reaction(emoji))
            .unwrap_or(false)
    }

    pub fn replace_emoji_options(&mut self, options: Vec<EmojiOption>) {
        self.emoji_options = options;
    }

    pub fn replace_quick_replies(&mut self, replies: Vec<String>) {
        self.quick_replies = replies;
    }

    pub fn clear_suggestions(&mut self) {
        self.emoji_options.clear();
        self.quick_replies.clear();
    }

    /// 取走全部消息并清空（仅供归档使用）
    pub fn snapshot_and_clear(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }

    /// 尝试进入忙碌状态；已忙碌时返回 false（不可重入锁）
    pub fn try_begin_turn(&mut self) -> bool {
        if self.busy {
            return false;
        }
        self.busy = true;
        true
    }

    pub fn end_turn(&mut self) {
        self.busy = false;
    }

    /// 一次性标记已问候；第二次调用返回 false
    pub fn mark_greeted(&mut self) -> bool {
        if self.greeted {
            return false;
        }
        self.greeted = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConversationState {
        let mut state = ConversationState::new();
        state.append_message(Message::model("Chào bạn!"));
        state.append_message(Message::user("Mình hơi mệt"));
        state.append_message(Message::model("Vậy à?"));
        state
    }

    #[test]
    fn test_reaction_goes_to_last_user_message() {
        let mut state = sample();
        state.append_message(Message::user("Ừ"));
        assert!(state.set_reaction_on_last_user_message("👍"));
        assert_eq!(state.messages()[3].reaction(), Some("👍"));
        assert_eq!(state.messages()[1].reaction(), None);
        assert_eq!(state.messages()[2].user_reaction(), None);

        assert!(!state.set_reaction_on_last_user_message("😢"));
        assert_eq!(state.messages()[3].reaction(), Some("👍"));
    }

    #[test]
    fn test_reaction_skips_trailing_model_messages() {
        let mut state = sample();
        assert!(state.set_reaction_on_last_user_message("🤗"));
        assert_eq!(state.messages()[1].reaction(), Some("🤗"));
    }

    #[test]
    fn test_reaction_without_user_message_is_dropped() {
        let mut state = ConversationState::new();
        state.append_message(Message::model("Chào bạn!"));
        assert!(!state.set_reaction_on_last_user_message("😊"));
        assert_eq!(state.messages()[0].reaction(), None);
    }

    #[test]
    fn test_user_reaction_rules() {
        let mut state = sample();
        assert!(state.set_user_reaction_on_message(0, "❤️"));
        assert!(!state.set_user_reaction_on_message(0, "🤔"));
        assert_eq!(state.messages()[0].user_reaction(), Some("❤️"));

        assert!(!state.set_user_reaction_on_message(1, "👍"));
        assert!(!state.set_user_reaction_on_message(42, "👍"));
    }

    #[test]
    fn test_suggestions_are_replaced_not_merged() {
        let mut state = ConversationState::new();
        state.replace_quick_replies(vec!["A".into(), "B".into()]);
        state.replace_quick_replies(vec!["C".into()]);
        assert_eq!(state.quick_replies(), ["C".to_string()]);

        state.replace_emoji_options(vec![EmojiOption::new("😊", "Vui")]);
        state.clear_suggestions();
        assert!(state.emoji_options().is_empty());
        assert!(state.quick_replies().is_empty());
    }

    #[test]
    fn test_busy_lock_is_not_reentrant() {
        let mut state = ConversationState::new();
        assert!(state.try_begin_turn());
        assert!(!state.try_begin_turn());
        state.end_turn();
        assert!(state.try_begin_turn());
    }

    #[test]
    fn test_greeted_is_one_shot() {
        let mut state = ConversationState::new();
        assert!(state.mark_greeted());
        assert!(!state.mark_greeted());
        assert!(state.is_greeted());
    }

    #[test]
    fn test_snapshot_and_clear() {
        let mut state = sample();
        state.mark_greeted();
        let taken = state.snapshot_and_clear();
        assert_eq!(taken.len(), 3);
        assert_eq!(taken[1].text(), "Mình hơi mệt");
        assert!(state.messages().is_empty());
        assert!(state.is_greeted());
    }
}
