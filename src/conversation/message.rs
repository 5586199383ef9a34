//! 对话消息
//!
//! 展示用的消息：角色、去掉指令后的文本、创建时间（本地 HH:MM），以及两种一次性写入的表情反应。

use serde::{Deserialize, Serialize};

/// 消息角色：用户 / 模型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// 单条消息
///
/// `reaction` 只出现在用户消息上（模型对这条消息的反应），`user_reaction` 只出现在模型消息上
/// （用户点选的反应）；两者都是先写为准，重复写入为无操作。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    role: Role,
    text: String,
    timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_reaction: Option<String>,
}

/// 当前本地时间，格式 HH:MM
pub fn local_timestamp() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_timestamp(Role::User, text, local_timestamp())
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::with_timestamp(Role::Model, text, local_timestamp())
    }

    pub fn with_timestamp(role: Role, text: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: timestamp.into(),
            reaction: None,
            user_reaction: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn reaction(&self) -> Option<&str> {
        self.reaction.as_deref()
    }

    pub fn user_reaction(&self) -> Option<&str> {
        self.user_reaction.as_deref()
    }

    /// 写入模型反应；非用户消息或已有反应时返回 false
    pub fn set_reaction(&mut self, emoji: impl Into<String>) -> bool {
        if self.role != Role::User || self.reaction.is_some() {
            return false;
        }
        self.reaction = Some(emoji.into());
        true
    }

    /// 写入用户反应；非模型消息或已有反应时返回 false
    pub fn set_user_reaction(&mut self, emoji: impl Into<String>) -> bool {
        if self.role != Role::Model || self.user_reaction.is_some() {
            return false;
        }
        self.user_reaction = Some(emoji.into());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_only_on_user_messages() {
        let mut model = Message::model("Chào bạn");
        assert!(!model.set_reaction("😊"));
        assert_eq!(model.reaction(), None);

        let mut user = Message::user("Mình buồn");
        assert!(!user.set_user_reaction("👍"));
        assert_eq!(user.user_reaction(), None);
    }

    #[test]
    fn test_first_write_wins() {
        let mut user = Message::user("Mình buồn");
        assert!(user.set_reaction("😢"));
        assert!(!user.set_reaction("😊"));
        assert_eq!(user.reaction(), Some("😢"));
    }

    #[test]
    fn test_timestamp_format() {
        let msg = Message::user("hi");
        assert_eq!(msg.timestamp().len(), 5);
        assert_eq!(&msg.timestamp()[2..3], ":");
    }

    #[test]
    fn test_json_shape() {
        let mut msg = Message::with_timestamp(Role::Model, "Chào", "09:30");
        msg.set_user_reaction("❤️");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "model");
        assert_eq!(json["userReaction"], "❤️");
        assert!(json.get("reaction").is_none());

        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
