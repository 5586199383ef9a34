//! 事件处理
//!
//! 轮询 crossterm 键盘事件：Ctrl+Q 转为 Command::Quit，其余按键交给 run_app 按焦点处理；
//! send / send_submit 把命令发给编排器。

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

use crate::core::Command;

/// 应用事件：来自快捷键的 Command 或原始 KeyEvent
#[derive(Debug, Clone)]
pub enum AppEvent {
    Command(Command),
    Key(KeyEvent),
}

/// 事件处理器：持有 cmd_tx，poll 时读键盘并返回 AppEvent
pub struct EventHandler {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl EventHandler {
    pub fn new(cmd_tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { cmd_tx }
    }

    pub fn poll(&self) -> anyhow::Result<Option<AppEvent>> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(Self::classify(key)));
                }
            }
        }
        Ok(None)
    }

    fn classify(key: KeyEvent) -> AppEvent {
        match key.code {
            KeyCode::Char('q') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                AppEvent::Command(Command::Quit)
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                AppEvent::Command(Command::Quit)
            }
            _ => AppEvent::Key(key),
        }
    }

    pub fn send(&self, cmd: Command) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::warn!("command channel closed");
        }
    }

    pub fn send_submit(&self, input: String) {
        self.send(Command::Submit(input));
    }
}

/// 输入框中的斜杠命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Archive,
    Archives,
    Export,
    Remind(String),
    RemindOff,
    Quit,
    Unknown(String),
}

/// 解析 `/xxx` 输入；非斜杠开头返回 None
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let rest = input.trim().strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    Some(match name.to_lowercase().as_str() {
        "archive" => SlashCommand::Archive,
        "archives" | "history" => SlashCommand::Archives,
        "export" => SlashCommand::Export,
        "remind" if arg.eq_ignore_ascii_case("off") => SlashCommand::RemindOff,
        "remind" => SlashCommand::Remind(arg.to_string()),
        "quit" | "exit" => SlashCommand::Quit,
        other => SlashCommand::Unknown(other.to_string()),
    })
}
