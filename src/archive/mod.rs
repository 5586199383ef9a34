//! 归档管理：把当前对话快照为带时间戳的不可变记录，最新在前，并清空当前对话
//!
//! 归档与轮次互斥（轮次进行中直接返回 None）；先持久化新列表，成功后才清空当前对话，
//! 存储失败时列表与当前对话都保持原样。归档不会重置 greeted。

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::Message;
use crate::core::{ChatError, TurnController};
use crate::storage::ArchiveStore;

/// 一次归档：ISO-8601 时间 + 当时的全部消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedConversation {
    #[serde(rename = "date")]
    pub archived_at: String,
    pub messages: Vec<Message>,
}

impl ArchivedConversation {
    pub fn new(archived_at: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            archived_at: archived_at.into(),
            messages,
        }
    }

    /// 以当前 UTC 时间创建
    pub fn now(messages: Vec<Message>) -> Self {
        Self::new(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true), messages)
    }
}

pub struct ArchiveManager {
    session: TurnController,
    store: ArchiveStore,
    entries: Vec<ArchivedConversation>,
}

impl ArchiveManager {
    pub fn new(session: TurnController, store: ArchiveStore, entries: Vec<ArchivedConversation>) -> Self {
        Self {
            session,
            store,
            entries,
        }
    }

    /// 从存储加载已有归档；读取失败时记录警告并从空列表开始
    pub fn load(session: TurnController, store: ArchiveStore) -> Self {
        let entries = store.load().unwrap_or_else(|e| {
            tracing::warn!("Archive load failed ({}), starting empty", e);
            Vec::new()
        });
        Self::new(session, store, entries)
    }

    /// 只读回放用
    pub fn entries(&self) -> &[ArchivedConversation] {
        &self.entries
    }

    /// 当前对话为空或轮次进行中时返回 Ok(None) 且不做任何修改。
    /// 归档期间占用 busy 锁，磁盘写入不持有状态互斥锁
    pub fn archive_current_conversation(&mut self) -> Result<Option<ArchivedConversation>, ChatError> {
        let Some(claim) = self.session.claim_idle() else {
            tracing::debug!("archive rejected: turn in flight");
            return Ok(None);
        };

        let messages = claim.take_messages();
        if messages.is_empty() {
            return Ok(None);
        }
        let entry = ArchivedConversation::now(messages);
        let mut next = Vec::with_capacity(self.entries.len() + 1);
        next.push(entry.clone());
        next.extend(self.entries.iter().cloned());

        if let Err(e) = self.store.save(&next) {
            claim.restore_messages(entry.messages);
            return Err(e);
        }

        self.entries = next;
        tracing::info!(
            messages = entry.messages.len(),
            total = self.entries.len(),
            "conversation archived"
        );
        Ok(Some(entry))
    }
}
