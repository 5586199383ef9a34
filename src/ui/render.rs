//! 界面渲染
//!
//! 标题栏显示阶段与提醒；主体为对话历史（按角色着色、附带双方的表情反应、按宽度换行）；
//! 其下是心情选项与快捷回复条，底部为输入框与快捷键提示。`/archives` 打开归档浮层。

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::conversation::Role;
use crate::core::{ConversationView, SessionPhase, SettingsView};
use crate::export::RoleLabels;

/// 输入焦点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    Suggestions,
    Messages,
}

/// TUI 本地状态：输入缓冲、焦点、选中项、确认与浮层
#[derive(Debug, Clone, Default)]
pub struct UiModel {
    pub input: String,
    pub focus: Focus,
    pub suggestion_index: usize,
    /// 选中的模型消息在 messages 中的下标
    pub selected_message: Option<usize>,
    pub confirm_archive: bool,
    pub show_archives: bool,
    pub archive_scroll: usize,
    pub conversation_scroll: usize,
}

/// 心情选项在前、快捷回复在后；值为点选后发送的文本
pub fn suggestions(view: &ConversationView) -> Vec<String> {
    view.emoji_options
        .iter()
        .map(|o| o.as_message())
        .chain(view.quick_replies.iter().cloned())
        .collect()
}

/// 将内容按宽度换行，支持 UTF-8（按字符数，避免在 UTF-8 中间截断）
fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        for ch in para.chars() {
            if line.chars().count() >= width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(ch);
        }
        lines.push(line);
    }
    lines
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// 绘制一帧；将 (总行数, 可视高度) 写入 out 供外部 clamp 滚动
#[allow(clippy::too_many_arguments)]
pub fn draw(
    f: &mut Frame,
    view: &ConversationView,
    settings: &SettingsView,
    model: &UiModel,
    labels: &RoleLabels,
    palette: &[String],
    app_name: &str,
    out: &mut (usize, usize),
) {
    let options = suggestions(view);
    let suggestion_height = if options.is_empty() { 0 } else { 3 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(suggestion_height),
            Constraint::Length(4),
        ])
        .split(f.area());

    let conv_area = chunks[0];
    let content_width = conv_area.width.saturating_sub(3) as usize; // 边框 + 滚动条

    let phase_str = match view.phase {
        SessionPhase::Starting => "đang kết nối…",
        SessionPhase::Idle => "sẵn sàng",
        SessionPhase::Waiting => "đang trả lời…",
        SessionPhase::Unavailable => "không khả dụng",
    };
    let reminder_str = settings
        .reminder
        .as_deref()
        .map(|t| format!(" │ ⏰ {}", t))
        .unwrap_or_default();
    let title = format!(" {} │ {}{} ", app_name, phase_str, reminder_str);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let mut text_lines: Vec<Line> = Vec::new();
    for (idx, m) in view.messages.iter().enumerate() {
        if idx > 0 {
            text_lines.push(Line::from(""));
        }
        let selected = model.focus == Focus::Messages && model.selected_message == Some(idx);
        let color = match m.role() {
            Role::User => Color::Cyan,
            Role::Model => Color::LightMagenta,
        };
        let header_style = if selected {
            Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        };
        text_lines.push(Line::from(vec![
            Span::styled(format!("{} ", labels.label(m.role())), header_style),
            Span::styled(m.timestamp().to_string(), Style::default().fg(Color::DarkGray)),
        ]));
        for line in wrap_text(m.text(), content_width.saturating_sub(2).max(20)) {
            text_lines.push(Line::from(format!("  {}", line)));
        }
        if let Some(reaction) = m.reaction() {
            text_lines.push(Line::from(Span::styled(
                format!("  ↳ {} {}", labels.model, reaction),
                Style::default().fg(Color::Yellow),
            )));
        }
        match m.user_reaction() {
            Some(reaction) => text_lines.push(Line::from(Span::styled(
                format!("  ↳ {} {}", labels.user, reaction),
                Style::default().fg(Color::Yellow),
            ))),
            None if selected && !view.input_locked => {
                let picker = palette
                    .iter()
                    .enumerate()
                    .map(|(i, e)| format!("{}:{}", i + 1, e))
                    .collect::<Vec<_>>()
                    .join("  ");
                text_lines.push(Line::from(Span::styled(
                    format!("  {}", picker),
                    Style::default().fg(Color::Gray),
                )));
            }
            None => {}
        }
    }
    if view.phase == SessionPhase::Waiting {
        text_lines.push(Line::from(""));
        text_lines.push(Line::from(Span::styled(
            format!("{} …", labels.model),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let content_height = conv_area.height.saturating_sub(2) as usize;
    let total_lines = text_lines.len();
    let max_scroll = total_lines.saturating_sub(content_height);
    let scroll_offset = model.conversation_scroll.min(max_scroll);

    let paragraph = Paragraph::new(Text::from(text_lines))
        .block(block)
        .scroll((scroll_offset as u16, 0));
    f.render_widget(paragraph, conv_area);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .position(scroll_offset)
            .viewport_content_length(content_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("█")
            .track_symbol(Some("░"));
        f.render_stateful_widget(scrollbar, conv_area, &mut scrollbar_state);
    }

    if !options.is_empty() {
        let spans: Vec<Span> = options
            .iter()
            .enumerate()
            .flat_map(|(i, text)| {
                let style = if model.focus == Focus::Suggestions && model.suggestion_index == i {
                    Style::default().fg(Color::Black).bg(Color::Yellow)
                } else {
                    Style::default().fg(Color::Yellow)
                };
                [Span::styled(format!(" {} ", text), style), Span::raw(" ")]
            })
            .collect();
        let bar = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title(" Gợi ý "))
            .wrap(Wrap { trim: true });
        f.render_widget(bar, chunks[1]);
    }

    let input_prompt = if model.confirm_archive {
        " Xóa và lưu trữ cuộc trò chuyện này? (y/n) ".to_string()
    } else if let Some(notice) = &settings.notice {
        format!(" {} ", notice)
    } else if view.input_locked {
        " Đang chờ… ".to_string()
    } else {
        " Nhập tin nhắn ".to_string()
    };
    let border_color = match (model.confirm_archive, model.focus) {
        (true, _) => Color::Red,
        (false, Focus::Input) => Color::Blue,
        _ => Color::DarkGray,
    };
    let hint = " Enter gửi │ Tab chuyển │ /archive /archives /export /remind HH:MM │ Ctrl+Q thoát ";
    let input_block = Block::default()
        .title(input_prompt)
        .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    let input = Paragraph::new(model.input.as_str())
        .block(input_block)
        .wrap(Wrap { trim: false })
        .style(if view.input_locked {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        });
    f.render_widget(input, chunks[2]);

    if model.show_archives {
        draw_archives(f, settings, model, labels);
    }

    out.0 = total_lines;
    out.1 = content_height;
}

fn draw_archives(f: &mut Frame, settings: &SettingsView, model: &UiModel, labels: &RoleLabels) {
    let area = popup_area(f.area(), 80, 80);
    let mut lines: Vec<Line> = Vec::new();
    if settings.archives.is_empty() {
        lines.push(Line::from("Chưa có cuộc trò chuyện nào được lưu trữ."));
    }
    for entry in &settings.archives {
        let date = chrono::DateTime::parse_from_rfc3339(&entry.archived_at)
            .map(|d| d.with_timezone(&chrono::Local).format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_else(|_| entry.archived_at.clone());
        lines.push(Line::from(Span::styled(
            format!("▸ {} ({})", date, entry.messages.len()),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        for m in &entry.messages {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {}: ", labels.label(m.role())),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(m.text().to_string()),
            ]));
        }
    }
    let popup = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .title(" Lưu trữ │ Esc đóng ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: false })
        .scroll((model.archive_scroll as u16, 0));
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}
