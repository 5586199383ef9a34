//! TUI 应用主循环
//!
//! 进入全屏/原始模式，读取对话与设置投影，按焦点把按键转为 Command 发送给编排器，
//! 每帧用 draw 渲染。归档需要在输入框下方确认 (y/n)。

use std::io::{self, Stdout};

use crossterm::event::{KeyCode, KeyEvent};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};

use crate::conversation::Role;
use crate::core::{Command, ConversationView, SettingsView};
use crate::export::RoleLabels;
use crate::ui::event::{parse_slash_command, AppEvent, EventHandler, SlashCommand};
use crate::ui::render::{draw, suggestions, Focus, UiModel};

/// 界面所需的静态配置
#[derive(Debug, Clone)]
pub struct UiConfig {
    pub app_name: String,
    pub labels: RoleLabels,
    pub reaction_palette: Vec<String>,
}

/// 按键处理结果
#[derive(Debug, PartialEq, Eq)]
enum KeyAction {
    Continue,
    Quit,
}

fn model_message_indices(view: &ConversationView) -> Vec<usize> {
    view.messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.role() == Role::Model)
        .map(|(i, _)| i)
        .collect()
}

fn next_focus(focus: Focus, view: &ConversationView) -> Focus {
    let has_suggestions = !suggestions(view).is_empty();
    let has_models = !model_message_indices(view).is_empty();
    match focus {
        Focus::Input if has_suggestions => Focus::Suggestions,
        Focus::Input | Focus::Suggestions if has_models => Focus::Messages,
        _ => Focus::Input,
    }
}

fn handle_slash(cmd: SlashCommand, model: &mut UiModel, events: &EventHandler) -> KeyAction {
    match cmd {
        SlashCommand::Archive => model.confirm_archive = true,
        SlashCommand::Archives => {
            model.show_archives = true;
            model.archive_scroll = 0;
        }
        SlashCommand::Export => events.send(Command::Export),
        SlashCommand::Remind(time) => events.send(Command::SetReminder(time)),
        SlashCommand::RemindOff => events.send(Command::CancelReminder),
        SlashCommand::Quit => return KeyAction::Quit,
        SlashCommand::Unknown(name) => tracing::debug!(name = %name, "unknown slash command"),
    }
    KeyAction::Continue
}

fn handle_key(
    key: KeyEvent,
    view: &ConversationView,
    model: &mut UiModel,
    events: &EventHandler,
    palette: &[String],
) -> KeyAction {
    if model.confirm_archive {
        model.confirm_archive = false;
        if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            events.send(Command::Archive);
        }
        return KeyAction::Continue;
    }

    if model.show_archives {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => model.show_archives = false,
            KeyCode::Up => model.archive_scroll = model.archive_scroll.saturating_sub(1),
            KeyCode::Down => model.archive_scroll = model.archive_scroll.saturating_add(1),
            KeyCode::PageUp => model.archive_scroll = model.archive_scroll.saturating_sub(10),
            KeyCode::PageDown => model.archive_scroll = model.archive_scroll.saturating_add(10),
            _ => {}
        }
        return KeyAction::Continue;
    }

    match key.code {
        KeyCode::Tab => {
            model.focus = next_focus(model.focus, view);
            model.suggestion_index = 0;
            model.selected_message = model_message_indices(view).last().copied();
            return KeyAction::Continue;
        }
        KeyCode::Esc => {
            model.focus = Focus::Input;
            return KeyAction::Continue;
        }
        KeyCode::PageUp => {
            model.conversation_scroll = model.conversation_scroll.saturating_sub(10);
            return KeyAction::Continue;
        }
        KeyCode::PageDown => {
            model.conversation_scroll = model.conversation_scroll.saturating_add(10);
            return KeyAction::Continue;
        }
        _ => {}
    }

    match model.focus {
        Focus::Input => match key.code {
            KeyCode::Enter => {
                let input = std::mem::take(&mut model.input);
                if let Some(cmd) = parse_slash_command(&input) {
                    return handle_slash(cmd, model, events);
                }
                if view.input_locked || input.trim().is_empty() {
                    model.input = input;
                } else {
                    events.send_submit(input);
                }
            }
            KeyCode::Backspace => {
                model.input.pop();
            }
            KeyCode::Char(c) => model.input.push(c),
            KeyCode::Up => model.conversation_scroll = model.conversation_scroll.saturating_sub(1),
            KeyCode::Down => model.conversation_scroll = model.conversation_scroll.saturating_add(1),
            _ => {}
        },
        Focus::Suggestions => {
            let options = suggestions(view);
            match key.code {
                KeyCode::Left => model.suggestion_index = model.suggestion_index.saturating_sub(1),
                KeyCode::Right => {
                    model.suggestion_index =
                        (model.suggestion_index + 1).min(options.len().saturating_sub(1))
                }
                KeyCode::Enter if !view.input_locked => {
                    if let Some(text) = options.get(model.suggestion_index) {
                        events.send_submit(text.clone());
                        model.focus = Focus::Input;
                    }
                }
                _ => {}
            }
        }
        Focus::Messages => {
            let indices = model_message_indices(view);
            let pos = model
                .selected_message
                .and_then(|sel| indices.iter().position(|&i| i == sel));
            match key.code {
                KeyCode::Up => {
                    model.selected_message = pos
                        .map(|p| indices[p.saturating_sub(1)])
                        .or_else(|| indices.last().copied());
                }
                KeyCode::Down => {
                    model.selected_message = pos
                        .map(|p| indices[(p + 1).min(indices.len() - 1)])
                        .or_else(|| indices.last().copied());
                }
                KeyCode::Char(c) if !view.input_locked => {
                    let emoji = c
                        .to_digit(10)
                        .and_then(|d| (d as usize).checked_sub(1))
                        .and_then(|i| palette.get(i));
                    if let (Some(index), Some(emoji)) = (model.selected_message, emoji) {
                        events.send(Command::React {
                            index,
                            emoji: emoji.clone(),
                        });
                    }
                }
                _ => {}
            }
        }
    }
    KeyAction::Continue
}

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端并通知编排器
pub async fn run_app(
    conversation_rx: watch::Receiver<ConversationView>,
    settings_rx: watch::Receiver<SettingsView>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    config: UiConfig,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(cmd_tx);
    let mut model = UiModel {
        conversation_scroll: usize::MAX,
        ..UiModel::default()
    };
    let mut last_len = 0usize;

    let result = loop {
        let view = conversation_rx.borrow().clone();
        let settings = settings_rx.borrow().clone();

        if view.messages.len() != last_len {
            last_len = view.messages.len();
            model.conversation_scroll = usize::MAX;
        }

        match events.poll() {
            Ok(Some(AppEvent::Command(Command::Quit))) => break Ok(()),
            Ok(Some(AppEvent::Command(cmd))) => events.send(cmd),
            Ok(Some(AppEvent::Key(key))) => {
                let action = handle_key(key, &view, &mut model, &events, &config.reaction_palette);
                if action == KeyAction::Quit {
                    break Ok(());
                }
            }
            Ok(None) => {}
            Err(e) => break Err(e),
        }

        let mut scroll_info = (0usize, 0usize);
        if let Err(e) = terminal.draw(|f| {
            draw(
                f,
                &view,
                &settings,
                &model,
                &config.labels,
                &config.reaction_palette,
                &config.app_name,
                &mut scroll_info,
            );
        }) {
            break Err(e.into());
        }
        let (total_lines, viewport_height) = scroll_info;
        model.conversation_scroll = model
            .conversation_scroll
            .min(total_lines.saturating_sub(viewport_height));

        tokio::task::yield_now().await;
    };

    events.send(Command::Quit);
    restore_terminal(&mut terminal)?;
    result
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn palette() -> Vec<String> {
        ["👍", "❤️", "😄", "🤔"].map(String::from).to_vec()
    }

    fn idle_view() -> ConversationView {
        ConversationView {
            messages: vec![Message::model("Chào!"), Message::user("Hi"), Message::model("Ừ")],
            quick_replies: vec!["Kể thêm".to_string()],
            input_locked: false,
            ..ConversationView::default()
        }
    }

    #[test]
    fn test_enter_submits_input() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = EventHandler::new(tx);
        let mut model = UiModel::default();
        let view = idle_view();
        for c in "xin chào".chars() {
            handle_key(key(KeyCode::Char(c)), &view, &mut model, &events, &palette());
        }
        handle_key(key(KeyCode::Enter), &view, &mut model, &events, &palette());
        assert_eq!(rx.try_recv().unwrap(), Command::Submit("xin chào".to_string()));
        assert!(model.input.is_empty());
    }

    #[test]
    fn test_locked_input_is_kept() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = EventHandler::new(tx);
        let mut model = UiModel {
            input: "chờ".to_string(),
            ..UiModel::default()
        };
        let view = ConversationView {
            input_locked: true,
            ..idle_view()
        };
        handle_key(key(KeyCode::Enter), &view, &mut model, &events, &palette());
        assert!(rx.try_recv().is_err());
        assert_eq!(model.input, "chờ");
    }

    #[test]
    fn test_archive_requires_confirmation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = EventHandler::new(tx);
        let mut model = UiModel {
            input: "/archive".to_string(),
            ..UiModel::default()
        };
        let view = idle_view();
        handle_key(key(KeyCode::Enter), &view, &mut model, &events, &palette());
        assert!(model.confirm_archive);
        assert!(rx.try_recv().is_err());

        handle_key(key(KeyCode::Char('n')), &view, &mut model, &events, &palette());
        assert!(rx.try_recv().is_err());

        model.input = "/archive".to_string();
        handle_key(key(KeyCode::Enter), &view, &mut model, &events, &palette());
        handle_key(key(KeyCode::Char('y')), &view, &mut model, &events, &palette());
        assert_eq!(rx.try_recv().unwrap(), Command::Archive);
    }

    #[test]
    fn test_reaction_on_selected_model_message() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = EventHandler::new(tx);
        let mut model = UiModel::default();
        let view = idle_view();

        handle_key(key(KeyCode::Tab), &view, &mut model, &events, &palette());
        assert_eq!(model.focus, Focus::Suggestions);
        handle_key(key(KeyCode::Tab), &view, &mut model, &events, &palette());
        assert_eq!(model.focus, Focus::Messages);
        assert_eq!(model.selected_message, Some(2));

        handle_key(key(KeyCode::Up), &view, &mut model, &events, &palette());
        assert_eq!(model.selected_message, Some(0));
        handle_key(key(KeyCode::Char('2')), &view, &mut model, &events, &palette());
        assert_eq!(
            rx.try_recv().unwrap(),
            Command::React {
                index: 0,
                emoji: "❤️".to_string()
            }
        );
    }

    #[test]
    fn test_suggestion_enter_submits() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = EventHandler::new(tx);
        let mut model = UiModel::default();
        let view = idle_view();
        handle_key(key(KeyCode::Tab), &view, &mut model, &events, &palette());
        handle_key(key(KeyCode::Enter), &view, &mut model, &events, &palette());
        assert_eq!(rx.try_recv().unwrap(), Command::Submit("Kể thêm".to_string()));
        assert_eq!(model.focus, Focus::Input);
    }
}
