//! 对话层：展示消息（含一次性表情反应）与会话状态

pub mod message;
pub mod state;

pub use message::{local_timestamp, Message, Role};
pub use state::ConversationState;
