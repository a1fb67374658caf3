use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{Action, App, CreateForm, FocusPane, FormField, InputMode, Screen, TextInput};
use novard_core::chat::ANALYZING;
use novard_core::doubts::{EMPTY_LIST, PLACEHOLDER};
use novard_core::markdown::{self, Inline};
use novard_core::{ChatSender, DetailBody, DoubtStatus, ListPanel, MessageView, Sender};

/// Display width of `text` up to `cursor` (in chars).
fn width_before(text: &str, cursor: usize) -> u16 {
    let before: String = text.chars().take(cursor).collect();
    u16::try_from(Line::raw(before).width()).unwrap_or(u16::MAX)
}

/// Cursor column and horizontal scroll for a single-line input `width`
/// cells wide. The text scrolls once the cursor would pass the right edge.
fn single_line_cursor(input: &TextInput, width: u16) -> (u16, u16) {
    let x = width_before(&input.value, input.cursor);
    let scroll = x.saturating_sub(width.saturating_sub(1));
    (x - scroll, scroll)
}

/// Ensure the selected item in a list is visible by adjusting the ListState offset.
fn ensure_selected_visible(state: &mut ListState, visible_rows: usize) {
    let visible_rows = visible_rows.max(1);

    if let Some(selected) = state.selected() {
        let min_offset = selected.saturating_sub(visible_rows - 1);
        let new_offset = state.offset().clamp(min_offset, selected);
        if new_offset != state.offset() {
            *state.offset_mut() = new_offset;
        }
    }
}

/// Rows a paragraph needs once wrapped to `width`. Estimate only: word
/// wrapping can take a little more.
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum::<usize>()
        .min(u16::MAX as usize) as u16
}

fn ellipsis(frame: u8) -> String {
    ".".repeat(frame as usize + 1)
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

/// Style a bot reply with the same tree the HTML renderer uses.
fn markdown_lines(text: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for block in markdown::parse(text).blocks {
        match block {
            markdown::Block::Heading { level, content } => {
                let style = match level {
                    1 => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                    2 => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    _ => Style::default().add_modifier(Modifier::BOLD),
                };
                lines.extend(inline_lines(&content, style));
            }
            markdown::Block::List(items) => {
                for item in items {
                    let mut item_lines = inline_lines(&item, Style::default());
                    if let Some(first) = item_lines.first_mut() {
                        first.spans.insert(0, Span::styled("  • ", Style::default().fg(Color::Cyan)));
                    }
                    lines.extend(item_lines);
                }
            }
            markdown::Block::Code(content) | markdown::Block::Paragraph(content) => {
                lines.extend(inline_lines(&content, Style::default()));
            }
            markdown::Block::Blank => lines.push(Line::default()),
        }
    }

    lines
}

/// Inline nodes to terminal lines. Only fenced code carries newlines.
fn inline_lines(nodes: &[Inline], base: Style) -> Vec<Line<'static>> {
    let mut rows: Vec<Vec<Span<'static>>> = vec![Vec::new()];
    push_spans(nodes, base, &mut rows);
    rows.into_iter().map(Line::from).collect()
}

fn push_spans(nodes: &[Inline], style: Style, rows: &mut Vec<Vec<Span<'static>>>) {
    for node in nodes {
        match node {
            Inline::Text(text) => push_span(rows, Span::styled(text.clone(), style)),
            Inline::Code(code) => push_span(rows, Span::styled(code.clone(), style.fg(Color::Yellow))),
            Inline::Strong(children) => push_spans(children, style.add_modifier(Modifier::BOLD), rows),
            Inline::Emphasis(children) => push_spans(children, style.add_modifier(Modifier::ITALIC), rows),
            Inline::CodeBlock(code) => {
                for (i, part) in code.split('\n').enumerate() {
                    if i > 0 {
                        rows.push(Vec::new());
                    }
                    if !part.is_empty() {
                        push_span(rows, Span::styled(part.to_string(), Style::default().fg(Color::Green)));
                    }
                }
            }
        }
    }
}

fn push_span(rows: &mut Vec<Vec<Span<'static>>>, span: Span<'static>) {
    if let Some(row) = rows.last_mut() {
        row.push(span);
    }
}

/// Plain text with a styled prefix on the first line.
fn labeled_lines(label: &str, text: &str, label_style: Style) -> Vec<Line<'static>> {
    text.split('\n')
        .enumerate()
        .map(|(i, part)| {
            if i == 0 {
                Line::from(vec![Span::styled(label.to_string(), label_style), Span::raw(part.to_string())])
            } else {
                Line::from(part.to_string())
            }
        })
        .collect()
}

fn message_lines(message: &MessageView) -> Vec<Line<'static>> {
    match (message.sender, message.label()) {
        (Sender::User, Some(label)) => labeled_lines(
            label,
            &message.text,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        (_, Some(label)) => labeled_lines(
            label,
            &message.text,
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ),
        (_, None) => markdown_lines(&message.text),
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Doubts => render_doubts_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    // Popups, most recent on top
    if let Some(form) = &app.create_form {
        render_create_form(form, frame, area);
    }
    if let Some(notes) = &app.resolve_notes {
        render_resolve_popup(notes, frame, area);
    }
    if let Some(message) = &app.alert {
        render_alert(message, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let filter = format!(" [{}]", app.controller.filter().display_name());

    let title = Line::from(vec![
        Span::styled(" Novard ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(filter, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(app.chat.identity().email.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Doubts => " DOUBTS ",
        Screen::Chat => " CHAT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {key} "), key_style),
            Span::styled(format!(" {label} "), label_style),
        ]
    };

    let hints: Vec<Span> = if app.alert.is_some() {
        hint("Enter", "dismiss").to_vec()
    } else if app.resolve_notes.is_some() {
        [hint("Enter", "resolve"), hint("Esc", "cancel")].concat()
    } else if app.create_form.is_some() {
        [
            hint("Tab", "field"),
            hint("^S", "submit"),
            hint("^O", "extract text"),
            hint("Esc", "cancel"),
        ]
        .concat()
    } else {
        match (app.screen, app.input_mode) {
            (Screen::Doubts, InputMode::Normal) => match app.focus {
                FocusPane::List => [
                    hint("j/k", "nav"),
                    hint("Enter", "open"),
                    hint("f", "filter"),
                    hint("n", "new"),
                    hint("i", "reply"),
                    hint("x", "resolve"),
                    hint("c", "chat"),
                    hint("q", "quit"),
                ]
                .concat(),
                FocusPane::Thread => [
                    hint("j/k", "scroll"),
                    hint("Tab", "list"),
                    hint("i", "reply"),
                    hint("a", "AI answer"),
                    hint("x", "resolve"),
                    hint("r", "refresh"),
                ]
                .concat(),
            },
            (Screen::Doubts, InputMode::Editing) => {
                [hint("Enter", "send"), hint("^A", "AI answer"), hint("Esc", "cancel")].concat()
            }
            (Screen::Chat, InputMode::Normal) => [
                hint("i", "type"),
                hint("j/k", "scroll"),
                hint("R", "restart"),
                hint("Esc", "doubts"),
                hint("q", "quit"),
            ]
            .concat(),
            (Screen::Chat, InputMode::Editing) => [hint("Enter", "send"), hint("Esc", "cancel")].concat(),
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    spans.extend(hints);
    if app.is_busy() {
        spans.push(Span::styled(
            format!(" Loading{}", ellipsis(app.animation_frame)),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ---------------------------------------------------------------------------
// Doubts screen
// ---------------------------------------------------------------------------

fn render_doubts_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [list_area, thread_area] =
        Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)]).areas(area);
    let [detail_area, reply_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(thread_area);

    // Store areas for mouse hit-testing
    app.list_area = Some(list_area);
    app.detail_area = Some(detail_area);

    render_list(app, frame, list_area);
    render_detail(app, frame, detail_area);
    render_reply_input(app, frame, reply_area);
}

fn border_color(focused: bool) -> Color {
    if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    }
}

fn render_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::List && app.input_mode == InputMode::Normal;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(format!(" Doubts: {} ", app.controller.filter().display_name()));

    let message = |text: String, style: Style| Paragraph::new(Span::styled(text, style)).wrap(Wrap { trim: true });
    let dim = Style::default().fg(Color::DarkGray);

    let rows = match app.controller.list_panel() {
        ListPanel::Idle | ListPanel::Loading => {
            frame.render_widget(message("Loading...".to_string(), dim).block(block), area);
            return;
        }
        ListPanel::Empty => {
            frame.render_widget(message(EMPTY_LIST.to_string(), dim).block(block), area);
            return;
        }
        ListPanel::Failed(error) => {
            frame.render_widget(message(error, Style::default().fg(Color::Red)).block(block), area);
            return;
        }
        ListPanel::Rows(rows) => rows,
    };

    let items: Vec<ListItem> = rows
        .into_iter()
        .map(|row| {
            let marker = if row.selected { "● " } else { "  " };
            let status_color = match row.status {
                DoubtStatus::Open => Color::Green,
                DoubtStatus::Resolved => Color::DarkGray,
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(marker, Style::default().fg(Color::Cyan)),
                    Span::styled(row.title, Style::default().add_modifier(Modifier::BOLD)),
                ]),
                Line::from(Span::styled(format!("  {}", row.meta), Style::default().fg(status_color))),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    // Two rows per doubt
    let visible = area.height.saturating_sub(2) as usize / 2;
    ensure_selected_visible(&mut app.list_state, visible);
    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_detail(app: &mut App, frame: &mut Frame, area: Rect) {
    let panel = app.controller.detail_panel();
    let focused = app.focus == FocusPane::Thread && app.input_mode == InputMode::Normal;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(format!(" {} ", panel.header));

    let dim = Style::default().fg(Color::DarkGray);
    let lines: Vec<Line> = match panel.body {
        DetailBody::Placeholder => vec![Line::from(Span::styled(PLACEHOLDER, dim))],
        DetailBody::Loading => vec![Line::from(Span::styled(
            format!("Loading{}", ellipsis(app.animation_frame)),
            dim.add_modifier(Modifier::ITALIC),
        ))],
        DetailBody::Failed(error) => vec![Line::from(Span::styled(error, Style::default().fg(Color::Red)))],
        DetailBody::Messages(messages) => {
            let mut lines = Vec::new();
            for message in &messages {
                lines.extend(message_lines(message));
                lines.push(Line::default());
            }
            lines
        }
    };

    let inner_height = area.height.saturating_sub(2);
    let max_scroll = wrapped_height(&lines, area.width.saturating_sub(2)).saturating_sub(inner_height);
    if app.controller.take_scroll_request() {
        app.detail_scroll = max_scroll;
    }
    app.detail_scroll = app.detail_scroll.min(max_scroll);

    let detail = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));
    frame.render_widget(detail, area);
}

fn render_reply_input(app: &App, frame: &mut Frame, area: Rect) {
    let panel = app.controller.detail_panel();
    let editing = app.screen == Screen::Doubts && app.input_mode == InputMode::Editing;

    let ai = if app.use_ai { "on" } else { "off" };
    let (title, color) = if panel.reply_enabled {
        (format!(" Reply (AI answer: {ai}) "), if editing { Color::Yellow } else { Color::DarkGray })
    } else {
        (" Reply ".to_string(), Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);

    let text = if app.reply_input.value.is_empty() && !editing {
        let hint = if panel.reply_enabled { "Press i to reply" } else { PLACEHOLDER };
        Span::styled(hint, Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(app.reply_input.value.clone())
    };

    let (cursor_x, scroll) = single_line_cursor(&app.reply_input, area.width.saturating_sub(2));
    frame.render_widget(Paragraph::new(text).block(block).scroll((0, scroll)), area);

    if editing {
        frame.set_cursor_position((area.x + 1 + cursor_x, area.y + 1));
    }
}

// ---------------------------------------------------------------------------
// Chat screen
// ---------------------------------------------------------------------------

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);
    app.chat_area = Some(chat_area);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.input_mode == InputMode::Normal)))
        .title(" Career chat ");

    let mut lines: Vec<Line> = Vec::new();
    let starting = app.pending == Some(Action::StartChat);

    if !starting {
        for entry in app.chat.entries() {
            match entry.sender {
                ChatSender::User => {
                    lines.push(Line::from(Span::styled(
                        entry.display(),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                }
                ChatSender::Bot => {
                    lines.push(Line::from(Span::styled(
                        "Novard:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    lines.extend(markdown_lines(&entry.text));
                }
                ChatSender::System => {
                    lines.push(Line::from(Span::styled(
                        entry.text.clone(),
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    )));
                }
            }
            lines.push(Line::default());
        }
    }

    let waiting = if starting {
        Some(ANALYZING.trim_end_matches('.').to_string())
    } else if app.chat.is_waiting() {
        Some("Thinking".to_string())
    } else {
        None
    };
    if let Some(label) = waiting {
        // Animated ellipsis: cycles through ".", "..", "..."
        lines.push(Line::from(Span::styled(
            format!("{label}{}", ellipsis(app.animation_frame)),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let inner_height = chat_area.height.saturating_sub(2);
    let max_scroll = wrapped_height(&lines, chat_area.width.saturating_sub(2)).saturating_sub(inner_height);
    if app.chat_follow {
        app.chat_scroll = max_scroll;
    }
    app.chat_scroll = app.chat_scroll.min(max_scroll);

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    let editing = app.input_mode == InputMode::Editing;
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(" Ask about your career ");

    let text = if app.chat_input.value.is_empty() && !editing {
        Span::styled("Press i to type a message", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(app.chat_input.value.clone())
    };
    let (cursor_x, scroll) = single_line_cursor(&app.chat_input, input_area.width.saturating_sub(2));
    frame.render_widget(Paragraph::new(text).block(input_block).scroll((0, scroll)), input_area);

    if editing {
        frame.set_cursor_position((input_area.x + 1 + cursor_x, input_area.y + 1));
    }
}

// ---------------------------------------------------------------------------
// Popups
// ---------------------------------------------------------------------------

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    )
}

fn field_block(title: &'static str, active: bool) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if active { Color::Yellow } else { Color::DarkGray }))
        .title(title)
}

fn render_create_form(form: &CreateForm, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 70, 20);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Ask a doubt ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let [title_area, question_area, image_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(inner);

    let fields = [
        (FormField::Title, " Title ", &form.title, title_area),
        (FormField::Question, " Question ", &form.question, question_area),
        (FormField::Image, " Image path (Enter to extract text) ", &form.image, image_area),
    ];

    for (field, label, input, field_area) in fields {
        let active = form.field == field;
        let paragraph = Paragraph::new(input.value.as_str())
            .block(field_block(label, active))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, field_area);

        if active {
            let (line, col) = input.cursor_line_col();
            let current = input.value.split('\n').nth(line).unwrap_or_default();
            let x = width_before(current, col).min(field_area.width.saturating_sub(3));
            let y = (line as u16).min(field_area.height.saturating_sub(3));
            frame.set_cursor_position((field_area.x + 1 + x, field_area.y + 1 + y));
        }
    }

    if let Some(status) = form.ocr_status {
        let status = Paragraph::new(status.message()).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(status, status_area);
    }
}

fn render_resolve_popup(notes: &TextInput, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 60, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Resolve doubt ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Resolution notes (optional). Enter to resolve, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 2));

    let input_area = Rect::new(inner.x, inner.y + 3, inner.width, 1);
    let (cursor_x, scroll) = single_line_cursor(notes, input_area.width);
    let input = Paragraph::new(notes.value.as_str())
        .style(Style::default().fg(Color::Cyan))
        .scroll((0, scroll));
    frame.render_widget(input, input_area);
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}

fn render_alert(message: &str, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 50, 6);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Error ");

    let text = Text::from(vec![
        Line::from(message.to_string()),
        Line::default(),
        Line::from(Span::styled("Press Enter to dismiss", Style::default().fg(Color::DarkGray))),
    ]);
    frame.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use novard_core::{Config, Identity, SessionStore};
    use ratatui::{backend::TestBackend, Terminal};
    use tempfile::tempdir;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_markdown_lines_structure() {
        let lines = markdown_lines("# Plan\n- learn **SQL**\n- practice\n\nUse `git` daily");
        let text: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(text, vec!["Plan", "  • learn SQL", "  • practice", "", "Use git daily"]);

        let sql = &lines[1].spans[2];
        assert_eq!(sql.content, "SQL");
        assert!(sql.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_markdown_lines_split_fenced_code() {
        let lines = markdown_lines("```\nfn main() {}\n**x**\n```");
        let text: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(text, vec!["", "fn main() {}", "**x**", ""]);
    }

    #[test]
    fn test_user_messages_are_not_styled_as_markdown() {
        let view = MessageView {
            sender: Sender::User,
            text: "**why** does\nthis fail".to_string(),
        };
        let text: Vec<String> = message_lines(&view).iter().map(plain).collect();
        assert_eq!(text, vec!["You: **why** does", "this fail"]);
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("abcdefghij"), Line::default(), Line::from("abc")];
        assert_eq!(wrapped_height(&lines, 4), 3 + 1 + 1);
        assert_eq!(wrapped_height(&lines, 0), 10 + 1 + 3);
    }

    #[test]
    fn test_single_line_cursor_counts_cells() {
        let input = |value: &str| TextInput {
            value: value.to_string(),
            cursor: value.chars().count(),
        };

        assert_eq!(single_line_cursor(&input("hello"), 10), (5, 0));
        assert_eq!(single_line_cursor(&input("日本語"), 10), (6, 0));
        assert_eq!(single_line_cursor(&input(&"a".repeat(30)), 10), (9, 21));
        assert_eq!(single_line_cursor(&input(""), 10), (0, 0));
    }

    #[test]
    fn test_long_chat_input_scrolls_to_cursor() {
        let dir = tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("session.json")).unwrap();
        let identity = Identity {
            user_id: 42,
            email: "asha@example.com".to_string(),
        };
        let mut app = App::new(&Config::new(), store, identity).unwrap();
        app.screen = Screen::Chat;
        app.input_mode = InputMode::Editing;
        app.chat_input.value = format!("{}END", "a".repeat(150));
        app.chat_input.cursor = 153;

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("END"));
        assert_eq!(terminal.get_cursor_position().unwrap().x, 98);
    }

    #[test]
    fn test_ensure_selected_visible() {
        let mut state = ListState::default();
        state.select(Some(9));
        ensure_selected_visible(&mut state, 4);
        assert_eq!(state.offset(), 6);
    }

    #[test]
    fn test_first_frame_shows_loading() {
        let dir = tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("session.json")).unwrap();
        let identity = Identity {
            user_id: 42,
            email: "asha@example.com".to_string(),
        };
        let mut app = App::new(&Config::new(), store, identity).unwrap();

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("Doubts: Open"));
        assert!(screen.contains("Loading..."));
        assert!(screen.contains(PLACEHOLDER));
        assert!(screen.contains("asha@example.com"));
    }
}
