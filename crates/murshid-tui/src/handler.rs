use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Paste(text) => {
            if app.input_mode == InputMode::Editing {
                insert_text(app, &text.replace(['\r', '\n'], " "));
            }
        }
        // Layout is recomputed on the next draw
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_language_picker {
        handle_language_picker(app, key);
    } else if app.show_settings {
        handle_settings(app, key);
    } else {
        match app.input_mode {
            InputMode::Normal => handle_normal_mode(app, key),
            InputMode::Editing => handle_editing_mode(app, key),
        }
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('m') | KeyCode::Tab => app.toggle_view(),
        KeyCode::Char('s') => app.show_settings = true,
        KeyCode::Char('l') => app.request_location(),
        KeyCode::Char('d') => app.delete_chat(),
        KeyCode::Char('x') => app.assistant.show_ads = false,
        KeyCode::Char(c @ '1'..='5') => {
            let index = c as usize - '1' as usize;
            app.send_chip(index);
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('G') | KeyCode::End => app.follow_chat = true,
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit_input(),
        KeyCode::Tab => app.toggle_view(),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => app.input_cursor = 0,
        KeyCode::End => app.input_cursor = app.input.chars().count(),
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::Char(c) => insert_text(app, &c.to_string()),
        _ => {}
    }
}

fn insert_text(app: &mut App, text: &str) {
    let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
    app.input.insert_str(byte_pos, text);
    app.input_cursor += text.chars().count();
}

fn handle_settings(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('s') | KeyCode::Char('q') => app.show_settings = false,
        KeyCode::Char('j') | KeyCode::Down => app.settings_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.settings_nav_up(),
        KeyCode::Enter | KeyCode::Char(' ') => app.activate_setting(),
        _ => {}
    }
}

fn handle_language_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_language_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.language_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.language_nav_up(),
        KeyCode::Enter => {
            app.select_language();
            app.show_settings = false;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_to_byte_index_multibyte() {
        let s = "مرحبا hi";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 1), 2);
        assert_eq!(char_to_byte_index(s, 6), 11);
        assert_eq!(char_to_byte_index(s, 100), s.len());
    }
}
