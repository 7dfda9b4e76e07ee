use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::App;
use crate::tui::AppEvent;

const MOUSE_SCROLL_LINES: u16 = 3;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => app.scroll_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
    }

    app.poll_round_trip().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Nothing but quitting once the session is blocked
    if app.session.is_blocked() {
        if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter) {
            app.should_quit = true;
        }
        return;
    }

    if app.show_model_picker {
        handle_model_picker(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.open_model_picker();
        }
        KeyCode::Tab => app.open_model_picker(),
        KeyCode::PageUp => {
            let page = app.page_size();
            app.scroll_up(page);
        }
        KeyCode::PageDown => {
            let page = app.page_size();
            app.scroll_down(page);
        }
        _ => handle_composer(app, key),
    }
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => {
            app.show_model_picker = false;
        }
        KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.show_model_picker = false;
        }
        KeyCode::Char('j') | KeyCode::Down => app.model_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.model_picker_nav_up(),
        KeyCode::Enter => app.select_model(),
        _ => {}
    }
}

/// Text entry keys. Ignored while input is disabled.
fn handle_composer(app: &mut App, key: KeyEvent) {
    if !app.session.input_enabled() {
        return;
    }

    let newline_modifier = key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT);
    if key.code == KeyCode::Enter && !newline_modifier {
        app.submit();
        return;
    }

    let composer = app.session.composer_mut();
    match key.code {
        KeyCode::Enter => composer.insert_newline(),
        // Terminals without the kitty protocol report Ctrl+J for a bare newline
        KeyCode::Char('j') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            composer.insert_newline();
        }
        KeyCode::Backspace => composer.backspace(),
        KeyCode::Delete => composer.delete(),
        KeyCode::Left => composer.move_left(),
        KeyCode::Right => composer.move_right(),
        KeyCode::Home => composer.move_home(),
        KeyCode::End => composer.move_end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            composer.insert_char(c);
        }
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.show_model_picker || !app.session.input_enabled() {
        return;
    }
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    app.session.composer_mut().insert_str(&normalized);
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(MOUSE_SCROLL_LINES),
        MouseEventKind::ScrollUp => app.scroll_up(MOUSE_SCROLL_LINES),
        _ => {}
    }
}
