//! 状态投影：ConversationView 与 SettingsView
//!
//! UI 只持有轻量的投影（阶段、消息、建议、锁）；完整状态由 TurnController 维护，每次原子修改后投影一次。

use serde::Serialize;

use crate::archive::ArchivedConversation;
use crate::conversation::{ConversationState, Message};
use crate::protocol::EmojiOption;

/// 会话阶段（UI 投影用）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// 会话已建立，等待开场问候完成
    Starting,
    Idle,
    /// 远端调用进行中
    Waiting,
    /// 初始化失败，会话不可用
    Unavailable,
}

/// UI 看到的对话投影
#[derive(Clone, Debug, Serialize)]
pub struct ConversationView {
    pub phase: SessionPhase,
    pub messages: Vec<Message>,
    pub emoji_options: Vec<EmojiOption>,
    pub quick_replies: Vec<String>,
    pub input_locked: bool,
}

impl Default for ConversationView {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Starting,
            messages: Vec::new(),
            emoji_options: Vec::new(),
            quick_replies: Vec::new(),
            input_locked: true,
        }
    }
}

impl ConversationView {
    /// 输入仅在会话可用、已问候且空闲时开放
    pub fn project(state: &ConversationState, initialized: bool) -> Self {
        let phase = if !initialized {
            SessionPhase::Unavailable
        } else if state.is_busy() {
            SessionPhase::Waiting
        } else if !state.is_greeted() {
            SessionPhase::Starting
        } else {
            SessionPhase::Idle
        };
        Self {
            phase,
            messages: state.messages().to_vec(),
            emoji_options: state.emoji_options().to_vec(),
            quick_replies: state.quick_replies().to_vec(),
            input_locked: phase != SessionPhase::Idle,
        }
    }
}

/// 设置面板投影：提醒、归档列表、最近一次操作提示
#[derive(Clone, Debug, Default, Serialize)]
pub struct SettingsView {
    pub reminder: Option<String>,
    pub archives: Vec<ArchivedConversation>,
    pub notice: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_projection() {
        let mut state = ConversationState::new();
        assert_eq!(ConversationView::project(&state, false).phase, SessionPhase::Unavailable);
        assert_eq!(ConversationView::project(&state, true).phase, SessionPhase::Starting);

        state.mark_greeted();
        let view = ConversationView::project(&state, true);
        assert_eq!(view.phase, SessionPhase::Idle);
        assert!(!view.input_locked);

        state.try_begin_turn();
        let view = ConversationView::project(&state, true);
        assert_eq!(view.phase, SessionPhase::Waiting);
        assert!(view.input_locked);
    }
}
