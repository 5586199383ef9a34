//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HONEYSUCKLE__*` 覆盖（双下划线表示嵌套，如 `HONEYSUCKLE__LLM__PROVIDER=mock`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub chat: ChatSection,
    pub labels: LabelsSection,
}

/// [app] 段：应用名、数据目录、提示历史保留轮数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 归档、提醒、导出与日志所在目录
    pub data_dir: PathBuf,
    pub max_context_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "HoneysuckleBot".to_string(),
            data_dir: PathBuf::from("data"),
            max_context_turns: 50,
        }
    }
}

/// [llm] 段：后端选择（gemini / openai / mock）与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [chat] 段：system 指令文件、开场引导语、反应表情面板、固定回复文案
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    pub system_prompt_path: PathBuf,
    pub bootstrap_message: String,
    pub reaction_palette: Vec<String>,
    pub replies: RepliesSection,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            system_prompt_path: PathBuf::from("config/prompts/system.txt"),
            bootstrap_message: "Bắt đầu cuộc trò chuyện.".to_string(),
            reaction_palette: ["👍", "❤️", "😄", "🤔"].map(String::from).to_vec(),
            replies: RepliesSection::default(),
        }
    }
}

/// [chat.replies] 段：各类失败时追加的模型消息
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepliesSection {
    pub init_failure: String,
    pub send_failure: String,
    pub reaction_failure: String,
    pub greeting_fallback: String,
}

impl Default for RepliesSection {
    fn default() -> Self {
        Self {
            init_failure: "Xin lỗi, đã có lỗi xảy ra khi khởi động. Vui lòng thử lại sau."
                .to_string(),
            send_failure: "Rất tiếc, mình gặp sự cố rồi. Bạn thử lại sau nhé.".to_string(),
            reaction_failure: "Rất tiếc, có lỗi xảy ra khi gửi phản ứng của bạn.".to_string(),
            greeting_fallback: "Xin chào! Mình là HoneysuckleBot. Rất vui được trò chuyện cùng bạn."
                .to_string(),
        }
    }
}

/// [labels] 段：导出与界面中的角色名
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LabelsSection {
    pub user: String,
    pub model: String,
}

impl Default for LabelsSection {
    fn default() -> Self {
        Self {
            user: "You".to_string(),
            model: "Bot".to_string(),
        }
    }
}

/// 未找到 system 指令文件时使用的最小指令（只说明指令格式）
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are HoneysuckleBot, a warm and supportive companion. \
Reply in Vietnamese. Prepend your reply with a reaction to the user's message formatted as [EMOJI_REACTION: 🤔]. \
When it helps, offer mood choices as [EMOJI_REPLY: \"😊 Vui vẻ\", \"😢 Buồn\"] and up to 4 suggested replies as \
[QUICK_REPLY: \"Gợi ý 1\", \"Gợi ý 2\"]. A message like [USER_REACTION: 👍] means the user reacted to your last \
message with that emoji; acknowledge it briefly.";

impl AppConfig {
    /// 读取 system 指令：配置路径 > ../ 同名路径 > 内置默认
    pub fn system_instruction(&self) -> String {
        let path = &self.chat.system_prompt_path;
        [path.clone(), PathBuf::from("..").join(path)]
            .iter()
            .find_map(|p| std::fs::read_to_string(p).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string())
    }
}

/// 从 config 目录加载配置，环境变量 HONEYSUCKLE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HONEYSUCKLE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HONEYSUCKLE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.provider, "gemini");
        assert_eq!(cfg.llm.timeouts.request, 60);
        assert_eq!(cfg.chat.reaction_palette.len(), 4);
        assert_eq!(cfg.labels.user, "You");
        assert_eq!(cfg.labels.model, "Bot");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[llm]\nprovider = \"mock\"\n\n[labels]\nuser = \"Bạn\"\n\n[chat.replies]\nsend_failure = \"oops\"\n",
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.labels.user, "Bạn");
        assert_eq!(cfg.labels.model, "Bot");
        assert_eq!(cfg.chat.replies.send_failure, "oops");
        assert!(cfg.chat.replies.reaction_failure.starts_with("Rất tiếc"));
        assert_eq!(cfg.chat.bootstrap_message, "Bắt đầu cuộc trò chuyện.");
    }

    #[test]
    fn test_missing_prompt_file_uses_builtin_instruction() {
        let mut cfg = AppConfig::default();
        cfg.chat.system_prompt_path = PathBuf::from("definitely/not/here.txt");
        assert_eq!(cfg.system_instruction(), DEFAULT_SYSTEM_INSTRUCTION);
    }
}
