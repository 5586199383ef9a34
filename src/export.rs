//! 对话导出：每条消息一行 `[时间] 角色: 文本`

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::config::LabelsSection;
use crate::conversation::{Message, Role};
use crate::core::ChatError;

/// 角色显示名（界面层可本地化，例如 user → "Bạn"）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleLabels {
    pub user: String,
    pub model: String,
}

impl Default for RoleLabels {
    fn default() -> Self {
        Self {
            user: "You".to_string(),
            model: "Bot".to_string(),
        }
    }
}

impl From<&LabelsSection> for RoleLabels {
    fn from(section: &LabelsSection) -> Self {
        Self {
            user: section.user.clone(),
            model: section.model.clone(),
        }
    }
}

impl RoleLabels {
    pub fn label(&self, role: Role) -> &str {
        match role {
            Role::User => &self.user,
            Role::Model => &self.model,
        }
    }
}

pub fn export_history(messages: &[Message], labels: &RoleLabels) -> String {
    messages
        .iter()
        .map(|m| format!("[{}] {}: {}", m.timestamp(), labels.label(m.role()), m.text()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("HoneysuckleBot_History_{}.txt", date.format("%Y-%m-%d"))
}

/// 写入 `<dir>/HoneysuckleBot_History_<日期>.txt`，返回文件路径
pub fn write_export(
    dir: &Path,
    messages: &[Message],
    labels: &RoleLabels,
    date: NaiveDate,
) -> Result<PathBuf, ChatError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(date));
    std::fs::write(&path, export_history(messages, labels))?;
    tracing::info!(path = %path.display(), messages = messages.len(), "conversation exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Message> {
        vec![
            Message::with_timestamp(Role::Model, "Chào bạn!", "09:00"),
            Message::with_timestamp(Role::User, "Mình hơi buồn", "09:01"),
        ]
    }

    #[test]
    fn test_export_lines() {
        let text = export_history(&sample(), &RoleLabels::default());
        assert_eq!(text, "[09:00] Bot: Chào bạn!\n[09:01] You: Mình hơi buồn");
    }

    #[test]
    fn test_localized_labels() {
        let labels = RoleLabels {
            user: "Bạn".to_string(),
            model: "Bot".to_string(),
        };
        let text = export_history(&sample(), &labels);
        assert!(text.ends_with("[09:01] Bạn: Mình hơi buồn"));
    }

    #[test]
    fn test_write_export() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let path = write_export(&dir.path().join("exports"), &sample(), &RoleLabels::default(), date)
            .unwrap();
        assert!(path.ends_with("HoneysuckleBot_History_2026-10-18.txt"));
        assert!(std::fs::read_to_string(path).unwrap().starts_with("[09:00] Bot:"));
    }
}
