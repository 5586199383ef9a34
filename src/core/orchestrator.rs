//! 会话编排器：主控循环
//!
//! 负责：根据配置建立远端会话、创建轮次控制器与归档管理器、触发一次性开场问候，
//! 并在后台任务中消费 UI 命令（Submit/React/Archive/Export/提醒/Quit）。
//! 每个轮次在独立任务中运行，命令循环保持响应：轮次进行中到达的触发由 busy 锁直接拒绝，而不是在通道里排队。

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::archive::ArchiveManager;
use crate::config::AppConfig;
use crate::core::{ChatError, ConversationView, ReplyTexts, SettingsView, TurnController, UserInput};
use crate::export::{write_export, RoleLabels};
use crate::llm::{create_gemini_client, ChatSession, LlmClient, MockLlmClient, OpenAiClient};
use crate::storage::{ArchiveStore, LocalStore, ReminderStore};

/// 从 UI 发往编排器的用户命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 提交文本（输入框、心情选项、快捷回复）
    Submit(String),
    /// 对第 index 条模型消息点选反应
    React { index: usize, emoji: String },
    /// 归档并清空当前对话（确认由 UI 负责）
    Archive,
    /// 导出当前对话为文本文件
    Export,
    SetReminder(String),
    CancelReminder,
    Quit,
}

/// 根据配置选择 LLM 后端（Gemini / OpenAI 兼容 / Mock）；缺少 Key 或未知后端即初始化失败
pub(crate) fn create_llm_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, ChatError> {
    let provider = cfg.llm.provider.to_lowercase();
    let timeout = cfg.llm.timeouts.request;
    match provider.as_str() {
        "gemini" => {
            let client = create_gemini_client(
                cfg.llm.model.as_deref(),
                cfg.llm.base_url.as_deref(),
                timeout,
            )
            .map_err(|e| ChatError::Init(e.to_string()))?;
            tracing::info!("Using Gemini LLM ({})", client.model());
            Ok(Arc::new(client))
        }
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| ChatError::Init("API key missing: set OPENAI_API_KEY".to_string()))?;
            let model = cfg.llm.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());
            tracing::info!("Using OpenAI LLM ({})", model);
            Ok(Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &model,
                &api_key,
                timeout,
            )))
        }
        "mock" => {
            tracing::warn!("Using Mock LLM");
            Ok(Arc::new(MockLlmClient))
        }
        other => Err(ChatError::Init(format!("unknown LLM provider '{}'", other))),
    }
}

/// 建立聊天会话：system 指令 + 所选后端
pub fn create_chat_session(cfg: &AppConfig) -> Result<ChatSession, ChatError> {
    let llm = create_llm_from_config(cfg)?;
    Ok(ChatSession::new(
        llm,
        cfg.system_instruction(),
        cfg.app.max_context_turns,
    ))
}

/// 创建会话运行时：返回命令发送端、对话投影接收端、设置投影接收端
pub async fn create_session(
    cfg: AppConfig,
) -> anyhow::Result<(
    mpsc::UnboundedSender<Command>,
    watch::Receiver<ConversationView>,
    watch::Receiver<SettingsView>,
)> {
    let store = LocalStore::new(&cfg.app.data_dir);
    let reminders = ReminderStore::new(store.clone());
    let labels = RoleLabels::from(&cfg.labels);
    let export_dir = cfg.app.data_dir.join("exports");

    let controller = TurnController::new(
        create_chat_session(&cfg),
        ReplyTexts::from(&cfg.chat.replies),
        cfg.chat.bootstrap_message.clone(),
    );
    let mut archive = ArchiveManager::load(controller.clone(), ArchiveStore::new(store));

    let reminder = reminders.get().unwrap_or_else(|e| {
        tracing::warn!("Reminder load failed ({}), ignoring", e);
        None
    });
    let (settings_tx, settings_rx) = watch::channel(SettingsView {
        reminder,
        archives: archive.entries().to_vec(),
        notice: None,
    });
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let conversation_rx = controller.subscribe();

    if controller.is_initialized() {
        let greeter = controller.clone();
        tokio::spawn(async move {
            let outcome = greeter.greet().await;
            tracing::debug!(?outcome, "initial greeting");
        });
    }

    tokio::spawn(async move {
        let notify = |notice: String| {
            settings_tx.send_modify(|s| s.notice = Some(notice));
        };

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                Command::Submit(text) => {
                    let controller = controller.clone();
                    tokio::spawn(async move {
                        let outcome = controller.run_turn(UserInput::Text(text)).await;
                        tracing::debug!(?outcome, "submit handled");
                    });
                }
                Command::React { index, emoji } => {
                    let controller = controller.clone();
                    tokio::spawn(async move {
                        let outcome = controller.react_to_message(index, &emoji).await;
                        tracing::debug!(?outcome, index, "reaction handled");
                    });
                }
                Command::Archive => match archive.archive_current_conversation() {
                    Ok(Some(entry)) => {
                        settings_tx.send_modify(|s| {
                            s.archives = archive.entries().to_vec();
                            s.notice = Some(format!(
                                "Đã lưu trữ {} tin nhắn.",
                                entry.messages.len()
                            ));
                        });
                    }
                    Ok(None) if controller.is_busy() => {
                        notify("Đang chờ phản hồi, thử lại sau.".to_string())
                    }
                    Ok(None) => notify("Không có gì để xoá.".to_string()),
                    Err(e) => {
                        tracing::warn!("Archive failed: {}", e);
                        notify(format!("Lưu trữ thất bại: {}", e));
                    }
                },
                Command::Export => {
                    let messages = controller.messages();
                    if messages.is_empty() {
                        notify("Không có gì để xuất.".to_string());
                        continue;
                    }
                    let today = chrono::Utc::now().date_naive();
                    match write_export(&export_dir, &messages, &labels, today) {
                        Ok(path) => notify(format!("Đã xuất: {}", path.display())),
                        Err(e) => {
                            tracing::warn!("Export failed: {}", e);
                            notify(format!("Xuất thất bại: {}", e));
                        }
                    }
                }
                Command::SetReminder(time) => match reminders.set(&time) {
                    Ok(time) => settings_tx.send_modify(|s| {
                        s.notice = Some(format!("Lời nhắc được đặt vào lúc: {}", time));
                        s.reminder = Some(time);
                    }),
                    Err(e) => notify(e.to_string()),
                },
                Command::CancelReminder => match reminders.cancel() {
                    Ok(()) => settings_tx.send_modify(|s| {
                        s.reminder = None;
                        s.notice = Some("Đã hủy lời nhắc.".to_string());
                    }),
                    Err(e) => notify(e.to_string()),
                },
                Command::Quit => break,
            }
        }
        tracing::info!("command loop finished");
    });

    Ok((cmd_tx, conversation_rx, settings_rx))
}
