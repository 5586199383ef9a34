//! 回复内嵌指令解析
//!
//! 模型回复是自由文本，其中可能夹带三种方括号指令：
//! - `[EMOJI_REACTION: 🤔]`：模型对用户上一条消息的表情反应
//! - `[EMOJI_REPLY: "😊 Vui vẻ", "😢 Buồn"]`：可点选的心情选项
//! - `[QUICK_REPLY: "Gợi ý 1", "Gợi ý 2"]`：快捷回复建议
//!
//! 按上述顺序逐个提取并从文本中删除；格式不对的指令体一律按「没有该指令」处理，绝不报错。

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// 心情选项：表情 + 文字标签
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiOption {
    pub emoji: String,
    pub label: String,
}

impl EmojiOption {
    pub fn new(emoji: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            emoji: emoji.into(),
            label: label.into(),
        }
    }

    /// 点选后作为用户输入发送的文本（`😊 Vui vẻ`）
    pub fn as_message(&self) -> String {
        if self.label.is_empty() {
            self.emoji.clone()
        } else {
            format!("{} {}", self.emoji, self.label)
        }
    }
}

/// 一次解析的结果
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedReply {
    /// 去掉所有指令后的展示文本（已 trim）；为空时本轮不产生气泡
    pub clean_text: String,
    pub reaction_emoji: Option<String>,
    pub emoji_options: Vec<EmojiOption>,
    pub quick_replies: Vec<String>,
}

static REACTION_RE: OnceLock<Regex> = OnceLock::new();
static EMOJI_REPLY_RE: OnceLock<Regex> = OnceLock::new();
static QUICK_REPLY_RE: OnceLock<Regex> = OnceLock::new();
static QUICK_REPLY_SPLIT_RE: OnceLock<Regex> = OnceLock::new();

// `.` 不匹配换行，指令不能跨行；`.*?` 止于第一个 `]`
fn reaction_re() -> &'static Regex {
    REACTION_RE.get_or_init(|| Regex::new(r"\[EMOJI_REACTION:\s*(.*?)\]").expect("valid regex"))
}

fn emoji_reply_re() -> &'static Regex {
    EMOJI_REPLY_RE.get_or_init(|| Regex::new(r"\[EMOJI_REPLY:\s*(.*?)\]").expect("valid regex"))
}

fn quick_reply_re() -> &'static Regex {
    QUICK_REPLY_RE.get_or_init(|| Regex::new(r"\[QUICK_REPLY:\s*(.*?)\]").expect("valid regex"))
}

fn quick_reply_split_re() -> &'static Regex {
    QUICK_REPLY_SPLIT_RE.get_or_init(|| Regex::new(r#""\s*,\s*""#).expect("valid regex"))
}

/// 取第一处指令的捕获内容，并删除文本中该指令的全部出现
fn extract(re: &Regex, text: &str) -> (Option<String>, String) {
    let body = re
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    match body {
        Some(body) => (Some(body), re.replace_all(text, "").trim().to_string()),
        None => (None, text.to_string()),
    }
}

fn parse_emoji_options(body: &str) -> Vec<EmojiOption> {
    body.split(',')
        .map(|entry| entry.replace('"', ""))
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(' ') {
            Some((emoji, label)) => EmojiOption::new(emoji, label.trim()),
            None => EmojiOption::new(entry, ""),
        })
        .collect()
}

fn parse_quick_replies(body: &str) -> Vec<String> {
    quick_reply_split_re()
        .split(body)
        .map(|entry| entry.replace('"', "").trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// 解析模型原始回复：纯函数，同样输入永远得到同样输出
pub fn parse_reply(raw: &str) -> ParsedReply {
    let text = raw.to_string();

    let (reaction, text) = extract(reaction_re(), &text);
    let reaction_emoji = reaction
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    let (emoji_body, text) = extract(emoji_reply_re(), &text);
    let emoji_options = emoji_body
        .as_deref()
        .map(parse_emoji_options)
        .unwrap_or_default();

    let (quick_body, text) = extract(quick_reply_re(), &text);
    let quick_replies = quick_body
        .as_deref()
        .map(parse_quick_replies)
        .unwrap_or_default();

    tracing::debug!(
        reaction = ?reaction_emoji,
        options = emoji_options.len(),
        quick_replies = quick_replies.len(),
        "parsed model reply"
    );

    ParsedReply {
        clean_text: text.trim().to_string(),
        reaction_emoji,
        emoji_options,
        quick_replies,
    }
}

/// 用户点击表情反应时合成的协议消息
pub fn user_reaction_token(emoji: &str) -> String {
    format!("[USER_REACTION: {}]", emoji)
}
