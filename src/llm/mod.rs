//! LLM 层：客户端抽象与实现（Gemini / OpenAI 兼容 / Mock）以及持久聊天会话

pub mod gemini;
pub mod mock;
pub mod openai;
pub mod prompt;
pub mod session;
pub mod traits;

pub use gemini::{create_gemini_client, GEMINI_BASE_URL, GEMINI_FLASH};
pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::OpenAiClient;
pub use prompt::{PromptMessage, PromptRole};
pub use session::ChatSession;
pub use traits::{LlmClient, LlmError};
