use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crate::app::{App, InputMode, Screen};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Shared line editing for the chat input and the API key popup.
fn edit_line(buf: &mut String, cursor: &mut usize, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(buf, *cursor);
                buf.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < buf.chars().count() {
                let byte_pos = char_to_byte_index(buf, *cursor);
                buf.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(buf.chars().count()),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = buf.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(buf, *cursor);
            buf.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
    app.poll_completion().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_api_key_input {
        handle_api_key_input(app, key);
        return;
    }
    if app.show_model_picker {
        handle_model_picker(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_chat_editing(app, key),
    }
}

fn handle_api_key_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_api_key_input = false;
            app.api_key_input.clear();
            app.api_key_input_cursor = 0;
        }
        KeyCode::Enter => app.apply_api_key(),
        _ => edit_line(&mut app.api_key_input, &mut app.api_key_input_cursor, key),
    }
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_model_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.model_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.model_picker_nav_up(),
        KeyCode::Enter => app.select_model(),
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Screen switching
        KeyCode::Tab => app.set_screen(app.screen.next()),
        KeyCode::BackTab => app.set_screen(app.screen.prev()),
        KeyCode::Char(c @ '1'..='5') => {
            let index = c as usize - '1' as usize;
            app.set_screen(Screen::ALL[index]);
        }

        // Popups
        KeyCode::Char('K') => app.open_api_key_input(),
        KeyCode::Char('M') => app.open_model_picker(),

        _ if app.screen == Screen::Coach => handle_coach_normal(app, key),
        _ => handle_form_normal(app, key),
    }
}

fn handle_form_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if let Some(form) = app.active_form_mut() {
                form.move_focus(1);
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if let Some(form) = app.active_form_mut() {
                form.move_focus(-1);
            }
        }
        KeyCode::Char('l') | KeyCode::Right => {
            if let Some(form) = app.active_form_mut() {
                form.adjust(1);
            }
        }
        KeyCode::Char('h') | KeyCode::Left => {
            if let Some(form) = app.active_form_mut() {
                form.adjust(-1);
            }
        }
        KeyCode::Char(' ') => {
            if let Some(form) = app.active_form_mut() {
                form.toggle();
            }
        }
        KeyCode::Enter => app.submit_plan(),

        // Output scrolling
        KeyCode::PageDown => app.scroll_output_down(),
        KeyCode::PageUp => app.scroll_output_up(),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_output_down()
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_output_up()
        }
        _ => {}
    }
}

fn handle_coach_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('j') | KeyCode::Down => {
            app.chat_scroll = app.chat_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.chat_scroll = app.chat_scroll.saturating_sub(1);
        }
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),
        KeyCode::Char('g') => app.chat_scroll = 0,
        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit_chat(),
        _ => edit_line(&mut app.chat_input, &mut app.chat_cursor, key),
    }
}
