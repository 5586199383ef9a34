//! HoneysuckleBot - 情绪陪伴聊天前端
//!
//! 模块划分：
//! - **protocol**: 回复内嵌指令（EMOJI_REACTION / EMOJI_REPLY / QUICK_REPLY / USER_REACTION）解析
//! - **conversation**: 消息与会话状态（写一次的反应、建议替换、快照清空）
//! - **core**: 轮次控制器（busy 锁）、界面投影、命令编排、错误类型
//! - **archive**: 对话归档（最新在前、先持久化后清空）
//! - **llm**: LLM 客户端抽象与实现（Gemini / OpenAI 兼容 / Mock）与持久聊天会话
//! - **storage**: 本地键值存储（归档列表、每日提醒）
//! - **export**: 对话导出为文本
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **observability**: tracing 日志
//! - **ui**: Ratatui TUI 界面

pub mod archive;
pub mod config;
pub mod conversation;
pub mod core;
pub mod export;
pub mod llm;
pub mod observability;
pub mod protocol;
pub mod storage;
pub mod ui;
