use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{Action, App, FocusPane, FormField, InputMode, Screen, TextInput};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_chat_task().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Popups take the keyboard, most recent first
    if app.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char(' ')) {
            app.alert = None;
        }
        return;
    }
    if app.resolve_notes.is_some() {
        handle_resolve_popup(app, key);
        return;
    }
    if app.create_form.is_some() {
        handle_create_form(app, key);
        return;
    }

    match (app.screen, app.input_mode) {
        (Screen::Doubts, InputMode::Normal) => handle_doubts_normal(app, key),
        (Screen::Doubts, InputMode::Editing) => handle_reply_editing(app, key),
        (Screen::Chat, InputMode::Normal) => handle_chat_normal(app, key),
        (Screen::Chat, InputMode::Editing) => handle_chat_editing(app, key),
    }
}

/// Cursor movement and character entry shared by every text field.
/// Returns false for keys it does not handle.
fn edit_input(input: &mut TextInput, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.insert(c),
        _ => return false,
    }
    true
}

fn handle_doubts_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::List => app.list_down(),
            FocusPane::Thread => app.detail_scroll = app.detail_scroll.saturating_add(1),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::List => app.list_up(),
            FocusPane::Thread => app.detail_scroll = app.detail_scroll.saturating_sub(1),
        },
        KeyCode::Char('g') => match app.focus {
            FocusPane::List => app.list_first(),
            FocusPane::Thread => app.detail_scroll = 0,
        },
        KeyCode::Char('G') => match app.focus {
            FocusPane::List => app.list_last(),
            FocusPane::Thread => app.detail_scroll = u16::MAX,
        },
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.detail_scroll = app.detail_scroll.saturating_add(10);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.detail_scroll = app.detail_scroll.saturating_sub(10);
        }

        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => {
            if app.focus == FocusPane::List {
                app.select_highlighted();
            }
        }
        KeyCode::Char('h') | KeyCode::Left => app.focus = FocusPane::List,
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::List => FocusPane::Thread,
                FocusPane::Thread => FocusPane::List,
            };
        }

        // Doubt actions
        KeyCode::Char('f') => app.cycle_filter(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('n') => app.open_create_form(),
        KeyCode::Char('i') => app.start_reply(),
        KeyCode::Char('a') => app.use_ai = !app.use_ai,
        KeyCode::Char('x') => app.open_resolve(),

        KeyCode::Char('c') => app.open_chat(),
        _ => {}
    }
}

fn handle_reply_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit_reply(),
        KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.use_ai = !app.use_ai;
        }
        _ => {
            edit_input(&mut app.reply_input, key);
        }
    }
}

fn handle_resolve_popup(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.resolve_notes = None,
        KeyCode::Enter => app.submit_resolve(),
        _ => {
            if let Some(notes) = app.resolve_notes.as_mut() {
                edit_input(notes, key);
            }
        }
    }
}

fn handle_create_form(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let Some(form) = app.create_form.as_mut() else {
        return;
    };

    match key.code {
        KeyCode::Esc => app.create_form = None,
        KeyCode::Tab => form.field = form.field.next(),
        KeyCode::BackTab => form.field = form.field.prev(),
        KeyCode::Char('s') if ctrl => app.submit_create_form(),
        KeyCode::Char('o') if ctrl => app.queue(Action::ExtractText),
        KeyCode::Enter => {
            let field = form.field;
            match field {
                FormField::Title => form.field = FormField::Question,
                FormField::Question => form.question.insert('\n'),
                FormField::Image => app.queue(Action::ExtractText),
            }
        }
        _ => {
            edit_input(form.active_input(), key);
        }
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc | KeyCode::Char('d') | KeyCode::Tab => app.screen = Screen::Doubts,
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('j') | KeyCode::Down => {
            app.chat_follow = false;
            app.chat_scroll = app.chat_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.chat_follow = false;
            app.chat_scroll = app.chat_scroll.saturating_sub(1);
        }
        KeyCode::Char('G') => app.chat_follow = true,
        KeyCode::Char('R') => app.restart_chat(),
        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit_chat(),
        _ => {
            edit_input(&mut app.chat_input, key);
        }
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let (x, y) = (mouse.column, mouse.row);
    let inside = |area: Option<Rect>| area.is_some_and(|r| point_in_rect(x, y, r));

    let delta: i16 = match mouse.kind {
        MouseEventKind::ScrollDown => 3,
        MouseEventKind::ScrollUp => -3,
        _ => return,
    };

    match app.screen {
        Screen::Doubts => {
            if inside(app.detail_area) {
                app.detail_scroll = app.detail_scroll.saturating_add_signed(delta);
            } else if inside(app.list_area) {
                if delta > 0 {
                    app.list_down();
                } else {
                    app.list_up();
                }
            }
        }
        Screen::Chat => {
            if inside(app.chat_area) {
                app.chat_follow = false;
                app.chat_scroll = app.chat_scroll.saturating_add_signed(delta);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_edit_input_ignores_control_chords() {
        let mut input = TextInput::default();
        assert!(edit_input(&mut input, key(KeyCode::Char('x'))));
        assert!(!edit_input(
            &mut input,
            KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)
        ));
        assert!(!edit_input(&mut input, key(KeyCode::Enter)));
        assert_eq!(input.value, "x");
    }

    #[test]
    fn test_shifted_chars_are_inserted() {
        let mut input = TextInput::default();
        edit_input(&mut input, KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT));
        assert_eq!(input.value, "A");
    }

    #[test]
    fn test_point_in_rect() {
        let rect = Rect::new(2, 2, 4, 3);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(5, 4, rect));
        assert!(!point_in_rect(6, 2, rect));
        assert!(!point_in_rect(1, 3, rect));
    }
}
