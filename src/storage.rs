//! 本地存储：按键存取的文件存储（每个键一个文件），以及基于它的归档列表与每日提醒
//!
//! 归档与提醒使用两个互相独立的键，互不影响。

use std::path::{Path, PathBuf};

use chrono::NaiveTime;

use crate::archive::ArchivedConversation;
use crate::core::ChatError;

pub const ARCHIVE_KEY: &str = "honeysuckle-archive";
pub const REMINDER_KEY: &str = "honeysuckle-reminder";

/// 键值文件存储：`<dir>/<key>`
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// 键不存在时返回 None
    pub fn get(&self, key: &str) -> std::io::Result<Option<String>> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 写入键；目录不存在时自动创建
    pub fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), value)
    }

    pub fn remove(&self, key: &str) -> std::io::Result<()> {
        match std::fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// 归档列表的持久化：JSON 数组，最新在前
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    store: LocalStore,
}

impl ArchiveStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<Vec<ArchivedConversation>, ChatError> {
        match self.store.get(ARCHIVE_KEY)? {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn save(&self, entries: &[ArchivedConversation]) -> Result<(), ChatError> {
        let data = serde_json::to_string_pretty(entries)?;
        self.store.set(ARCHIVE_KEY, &data)?;
        Ok(())
    }
}

/// 每日提醒时间（HH:MM），与对话数据分开存放
#[derive(Debug, Clone)]
pub struct ReminderStore {
    store: LocalStore,
}

impl ReminderStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn get(&self) -> Result<Option<String>, ChatError> {
        Ok(self
            .store
            .get(REMINDER_KEY)?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }

    /// 设置提醒；时间必须是 HH:MM，保存规范化后的格式
    pub fn set(&self, time: &str) -> Result<String, ChatError> {
        let parsed = NaiveTime::parse_from_str(time.trim(), "%H:%M")
            .map_err(|_| ChatError::InvalidReminder(time.to_string()))?;
        let normalized = parsed.format("%H:%M").to_string();
        self.store.set(REMINDER_KEY, &normalized)?;
        tracing::info!(time = %normalized, "reminder set");
        Ok(normalized)
    }

    pub fn cancel(&self) -> Result<(), ChatError> {
        self.store.remove(REMINDER_KEY)?;
        tracing::info!("reminder cancelled");
        Ok(())
    }
}
