//! 轮次控制器：一次完整的请求/回复周期
//!
//! 发送 → 等待 → 解析指令 → 应用到会话状态；失败时追加固定的致歉消息。
//! busy 是不可重入锁：轮次进行中到达的任何触发（提交、反应点击、开场问候）都直接拒绝，不排队。
//! 会话状态放在 std Mutex 中，只在同步片段内持有，绝不跨 await。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::config::RepliesSection;
use crate::conversation::{ConversationState, Message};
use crate::core::{ChatError, ConversationView, TurnRejection};
use crate::llm::ChatSession;
use crate::protocol::{parse_reply, user_reaction_token};

/// 触发一轮的输入：普通文本，或以 `[USER_REACTION: …]` 发送的静默反应
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Text(String),
    Reaction(String),
}

/// 一轮的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// 收到回复；displayed 表示是否追加了模型消息（纯指令回复不产生气泡）
    Completed { displayed: bool },
    /// 传输失败，已追加致歉消息
    Failed,
    Rejected(TurnRejection),
}

/// 固定回复文案
#[derive(Debug, Clone)]
pub struct ReplyTexts {
    pub init_failure: String,
    pub send_failure: String,
    pub reaction_failure: String,
    pub greeting_fallback: String,
}

impl From<&RepliesSection> for ReplyTexts {
    fn from(section: &RepliesSection) -> Self {
        Self {
            init_failure: section.init_failure.clone(),
            send_failure: section.send_failure.clone(),
            reaction_failure: section.reaction_failure.clone(),
            greeting_fallback: section.greeting_fallback.clone(),
        }
    }
}

impl Default for ReplyTexts {
    fn default() -> Self {
        Self::from(&RepliesSection::default())
    }
}

/// 会话上下文：一个会话一份，显式持有而非全局状态
struct SessionContext {
    state: Mutex<ConversationState>,
    chat: Option<tokio::sync::Mutex<ChatSession>>,
    texts: ReplyTexts,
    bootstrap_message: String,
    view_tx: watch::Sender<ConversationView>,
}

impl SessionContext {
    fn lock_state(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &ConversationState) {
        self.view_tx
            .send_replace(ConversationView::project(state, self.chat.is_some()));
    }
}

/// 持有期间 busy 为真；任何退出路径（含 panic、future 被丢弃）都会在 drop 时释放并投影
struct TurnGuard {
    ctx: Arc<SessionContext>,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        let mut state = self.ctx.lock_state();
        state.end_turn();
        self.ctx.publish(&state);
    }
}

/// 归档等非轮次操作对会话的独占占用：持有期间 busy 为真，其他轮次一律被拒绝
pub struct IdleClaim {
    guard: TurnGuard,
}

impl IdleClaim {
    /// 取走全部消息；不投影，占用释放时统一投影
    pub fn take_messages(&self) -> Vec<Message> {
        self.guard.ctx.lock_state().snapshot_and_clear()
    }

    /// 放回取走的消息（持久化失败时回滚）
    pub fn restore_messages(&self, messages: Vec<Message>) {
        let mut state = self.guard.ctx.lock_state();
        for message in messages {
            state.append_message(message);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TurnKind {
    Text,
    Reaction,
    Greeting,
}

/// 问候开始前只允许问候轮次，其余触发一律拒绝
fn require_greeted(state: &mut ConversationState) -> Result<(), TurnRejection> {
    if state.is_greeted() {
        Ok(())
    } else {
        Err(TurnRejection::NotGreeted)
    }
}

/// 轮次控制器句柄；克隆后共享同一会话
#[derive(Clone)]
pub struct TurnController {
    ctx: Arc<SessionContext>,
}

impl TurnController {
    /// 用远端会话的建立结果创建控制器；建立失败时追加一条初始化致歉消息，会话永久不可用
    pub fn new(
        chat: Result<ChatSession, ChatError>,
        texts: ReplyTexts,
        bootstrap_message: impl Into<String>,
    ) -> Self {
        let mut state = ConversationState::new();
        let chat = match chat {
            Ok(session) => {
                tracing::info!(backend = session.backend(), "chat session ready");
                Some(tokio::sync::Mutex::new(session))
            }
            Err(e) => {
                tracing::error!(error = %e, "chat session initialization failed");
                state.append_message(Message::model(texts.init_failure.clone()));
                None
            }
        };
        let (view_tx, _) = watch::channel(ConversationView::project(&state, chat.is_some()));

        Self {
            ctx: Arc::new(SessionContext {
                state: Mutex::new(state),
                chat,
                texts,
                bootstrap_message: bootstrap_message.into(),
                view_tx,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationView> {
        self.ctx.view_tx.subscribe()
    }

    /// 最新投影
    pub fn view(&self) -> ConversationView {
        self.ctx.view_tx.borrow().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.ctx.chat.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.ctx.lock_state().is_busy()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.ctx.lock_state().messages().to_vec()
    }

    /// 空闲时在锁内修改状态并投影；轮次进行中返回 None（归档等操作据此与轮次互斥）
    pub fn with_idle_state<R>(&self, f: impl FnOnce(&mut ConversationState) -> R) -> Option<R> {
        let mut state = self.ctx.lock_state();
        if state.is_busy() {
            return None;
        }
        let result = f(&mut state);
        self.ctx.publish(&state);
        Some(result)
    }

    /// 空闲时占用 busy 锁，在锁外做 I/O 而不阻塞状态互斥锁；轮次进行中返回 None
    pub fn claim_idle(&self) -> Option<IdleClaim> {
        if !self.ctx.lock_state().try_begin_turn() {
            return None;
        }
        Some(IdleClaim {
            guard: TurnGuard {
                ctx: self.ctx.clone(),
            },
        })
    }

    /// 运行一轮。文本输入会追加用户消息；反应输入静默发送，不产生用户气泡
    pub async fn run_turn(&self, input: UserInput) -> TurnOutcome {
        match input {
            UserInput::Text(text) => {
                let guard = self.begin(|state| {
                    require_greeted(state)?;
                    if text.trim().is_empty() {
                        return Err(TurnRejection::EmptyInput);
                    }
                    state.append_message(Message::user(text.clone()));
                    Ok(())
                });
                match guard {
                    Ok(guard) => self.exchange(guard, &text, TurnKind::Text).await,
                    Err(reason) => TurnOutcome::Rejected(reason),
                }
            }
            UserInput::Reaction(emoji) => match self.begin(require_greeted) {
                Ok(guard) => {
                    self.exchange(guard, &user_reaction_token(&emoji), TurnKind::Reaction)
                        .await
                }
                Err(reason) => TurnOutcome::Rejected(reason),
            },
        }
    }

    /// 用户点击模型消息上的反应：记录 user_reaction 后发送反应令牌
    pub async fn react_to_message(&self, index: usize, emoji: &str) -> TurnOutcome {
        let guard = self.begin(|state| {
            require_greeted(state)?;
            if state.set_user_reaction_on_message(index, emoji) {
                Ok(())
            } else {
                Err(TurnRejection::ReactionNotApplicable)
            }
        });
        match guard {
            Ok(guard) => {
                self.exchange(guard, &user_reaction_token(emoji), TurnKind::Reaction)
                    .await
            }
            Err(reason) => TurnOutcome::Rejected(reason),
        }
    }

    /// 开场问候：每个会话只触发一次，用固定引导语发起一轮，不显示用户气泡
    pub async fn greet(&self) -> TurnOutcome {
        let guard = self.begin(|state| {
            if state.mark_greeted() {
                Ok(())
            } else {
                Err(TurnRejection::AlreadyGreeted)
            }
        });
        match guard {
            Ok(guard) => {
                let bootstrap = self.ctx.bootstrap_message.clone();
                self.exchange(guard, &bootstrap, TurnKind::Greeting).await
            }
            Err(reason) => TurnOutcome::Rejected(reason),
        }
    }

    /// 在一个临界区内检查前置条件并进入 busy。
    /// `prepare` 返回 Err 时不得修改状态。
    fn begin(
        &self,
        prepare: impl FnOnce(&mut ConversationState) -> Result<(), TurnRejection>,
    ) -> Result<TurnGuard, TurnRejection> {
        if self.ctx.chat.is_none() {
            return Err(TurnRejection::NotInitialized);
        }
        let mut state = self.ctx.lock_state();
        if state.is_busy() {
            tracing::debug!("turn rejected: another turn is in flight");
            return Err(TurnRejection::Busy);
        }
        prepare(&mut state).inspect_err(|reason| tracing::debug!(?reason, "turn rejected"))?;
        state.clear_suggestions();
        state.try_begin_turn();
        self.ctx.publish(&state);
        Ok(TurnGuard {
            ctx: self.ctx.clone(),
        })
    }

    async fn exchange(&self, guard: TurnGuard, wire: &str, kind: TurnKind) -> TurnOutcome {
        let Some(chat) = self.ctx.chat.as_ref() else {
            return TurnOutcome::Rejected(TurnRejection::NotInitialized);
        };

        let result = chat.lock().await.send_message(wire).await;

        let mut state = self.ctx.lock_state();
        let outcome = match result {
            Ok(raw) => {
                let parsed = parse_reply(&raw);
                if let Some(emoji) = parsed.reaction_emoji.as_deref() {
                    state.set_reaction_on_last_user_message(emoji);
                }
                state.replace_emoji_options(parsed.emoji_options);
                state.replace_quick_replies(parsed.quick_replies);
                let displayed = !parsed.clean_text.is_empty();
                if displayed {
                    state.append_message(Message::model(parsed.clean_text));
                }
                tracing::info!(?kind, displayed, "turn completed");
                TurnOutcome::Completed { displayed }
            }
            Err(e) => {
                tracing::error!(?kind, error = %e, "chat exchange failed");
                let texts = &self.ctx.texts;
                let apology = match kind {
                    TurnKind::Text => &texts.send_failure,
                    TurnKind::Reaction => &texts.reaction_failure,
                    TurnKind::Greeting => &texts.greeting_fallback,
                };
                state.append_message(Message::model(apology.clone()));
                TurnOutcome::Failed
            }
        };
        drop(state);
        drop(guard);
        outcome
    }
}
