//! 核心层：错误类型、状态投影、轮次控制器、会话编排

pub mod error;
pub mod orchestrator;
pub mod state;
pub mod turn;

pub use error::{ChatError, TurnRejection};
pub use orchestrator::{create_chat_session, create_session, Command};
pub use state::{ConversationView, SessionPhase, SettingsView};
pub use turn::{IdleClaim, ReplyTexts, TurnController, TurnOutcome, UserInput};
