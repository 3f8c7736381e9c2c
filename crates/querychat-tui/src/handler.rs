use std::path::Path;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use querychat_core::Intent;
use tracing::debug;

use crate::app::{App, Feedback, InputMode};
use crate::tui::AppEvent;

const ATTACH_COMMAND: &str = "/attach";

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Tick => app.tick(),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    app.status = None;

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.input_cursor = app.input_text().chars().count();
        }

        // Message selection
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::Char('g') => {
            if !app.controller.transcript().is_empty() {
                app.selected = Some(0);
            }
        }
        KeyCode::Char('G') => {
            app.selected = app.controller.transcript().len().checked_sub(1);
            app.scroll_to_bottom();
        }
        KeyCode::Esc => app.selected = None,

        // Scrolling
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(app.chat_height / 2);
        }
        KeyCode::PageDown => app.scroll_down(app.chat_height),
        KeyCode::PageUp => app.scroll_up(app.chat_height),

        // Message actions
        KeyCode::Char('e') => begin_edit_selected(app),
        KeyCode::Char('c') => copy_selected(app),
        KeyCode::Char('+') => feedback_selected(app, Feedback::Liked),
        KeyCode::Char('-') => feedback_selected(app, Feedback::Disliked),

        KeyCode::Char('t') => {
            app.toggle_theme();
            let theme = app.theme.as_str();
            app.set_status(format!("Theme: {}", theme));
        }

        _ => {}
    }
}

fn begin_edit_selected(app: &mut App) {
    let Some(index) = app.selected else {
        app.set_warning("Select a message to edit (j/k)");
        return;
    };

    match app.controller.dispatch(Intent::BeginEdit(index)) {
        Ok(_) => {
            app.input_mode = InputMode::Editing;
            app.input_cursor = app.input_text().chars().count();
        }
        Err(e) => app.set_warning(e.to_string()),
    }
}

fn copy_selected(app: &mut App) {
    let selected_text = app
        .selected
        .and_then(|i| app.controller.transcript().get(i))
        .map(|m| m.text.clone());
    let Some(text) = selected_text else {
        app.set_warning("Select a message to copy (j/k)");
        return;
    };

    if copy_to_clipboard(&text) {
        app.set_status("Copied to clipboard");
    } else {
        app.set_warning("No clipboard tool found (pbcopy, wl-copy or xclip)");
    }
}

fn feedback_selected(app: &mut App, feedback: Feedback) {
    let Some(index) = app.selected else {
        app.set_warning("Select a bot message first (j/k)");
        return;
    };

    if app.give_feedback(index, feedback) {
        match app.feedback.get(&index) {
            Some(Feedback::Liked) => app.set_status("Marked as helpful"),
            Some(Feedback::Disliked) => app.set_status("Marked as not helpful"),
            None => app.set_status("Feedback cleared"),
        }
    } else {
        app.set_warning("Only bot messages can be rated");
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            // Leaving the input box drops any edit in progress
            app.controller.cancel_edit();
            app.input_mode = InputMode::Normal;
            app.input_cursor = 0;
        }
        KeyCode::Enter => submit_input(app),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let mut text = app.input_text().to_string();
                let byte_pos = char_to_byte_index(&text, app.input_cursor);
                text.remove(byte_pos);
                app.set_input_text(&text);
            }
        }
        KeyCode::Delete => {
            let mut text = app.input_text().to_string();
            if app.input_cursor < text.chars().count() {
                let byte_pos = char_to_byte_index(&text, app.input_cursor);
                text.remove(byte_pos);
                app.set_input_text(&text);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input_text().chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input_text().chars().count();
        }
        KeyCode::Char(c) => {
            let mut text = app.input_text().to_string();
            let byte_pos = char_to_byte_index(&text, app.input_cursor);
            text.insert(byte_pos, c);
            app.set_input_text(&text);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

fn submit_input(app: &mut App) {
    if app.is_editing_message() {
        match app.controller.dispatch(Intent::CommitEdit) {
            Ok(turn) => {
                debug!(?turn, "edit committed");
                app.input_mode = InputMode::Normal;
                app.input_cursor = 0;
                app.set_status("Message edited, asking again");
                app.scroll_to_bottom();
            }
            Err(e) => app.set_warning(e.to_string()),
        }
        return;
    }

    if let Some(path) = parse_attach_command(app.input_text()) {
        let file_name = Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        let name = file_name.unwrap_or(path);
        match app.controller.dispatch(Intent::AttachFile(name)) {
            Ok(_) => {
                app.set_input_text("");
                app.input_cursor = 0;
                app.scroll_to_bottom();
            }
            Err(e) => app.set_warning(e.to_string()),
        }
        return;
    }

    // Whitespace-only input is ignored by the controller
    if let Ok(Some(_)) = app.controller.dispatch(Intent::Submit) {
        app.input_cursor = 0;
        app.selected = None;
        app.scroll_to_bottom();
    }
}

/// `/attach <path>` typed into the input box
fn parse_attach_command(input: &str) -> Option<String> {
    let rest = input.trim().strip_prefix(ATTACH_COMMAND)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let path = rest.trim();
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

/// Hand text to the first clipboard tool that is installed.
fn copy_to_clipboard(text: &str) -> bool {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let tools: [(&str, &[&str]); 3] = [
        ("pbcopy", &[]),
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
    ];

    for (program, args) in tools {
        if let Ok(mut child) = Command::new(program).args(args).stdin(Stdio::piped()).spawn() {
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(text.as_bytes());
            }
            return child.wait().map(|s| s.success()).unwrap_or(false);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use querychat_core::{Config, QueryBackend, QueryError};
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct EchoBackend;

    #[async_trait]
    impl QueryBackend for EchoBackend {
        async fn query(&self, text: &str) -> Result<Value, QueryError> {
            Ok(json!({ "response": format!("echo: {text}") }))
        }
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).unwrap();
        }
    }

    fn test_app() -> App {
        App::new(Arc::new(EchoBackend), "http://test/query", Config::new(), None)
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[test]
    fn test_parse_attach_command() {
        assert_eq!(parse_attach_command("/attach notes.txt"), Some("notes.txt".to_string()));
        assert_eq!(parse_attach_command("  /attach   ~/a b.md "), Some("~/a b.md".to_string()));
        assert_eq!(parse_attach_command("/attach"), None);
        assert_eq!(parse_attach_command("/attachment.txt"), None);
        assert_eq!(parse_attach_command("attach notes.txt"), None);
    }

    #[tokio::test]
    async fn test_typing_and_enter_submits() {
        let mut app = test_app();
        type_text(&mut app, "héllo");
        handle_event(&mut app, key(KeyCode::Left)).unwrap();
        handle_event(&mut app, key(KeyCode::Backspace)).unwrap();
        assert_eq!(app.input_text(), "hélo");

        handle_event(&mut app, key(KeyCode::Enter)).unwrap();

        assert_eq!(app.input_text(), "");
        assert_eq!(app.input_cursor, 0);
        assert_eq!(app.controller.transcript().len(), 1);
        app.controller.settle().await;
        assert_eq!(app.controller.transcript().get(1).unwrap().text, "echo: hélo");
    }

    #[tokio::test]
    async fn test_blank_enter_does_nothing() {
        let mut app = test_app();
        type_text(&mut app, "   ");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert!(app.controller.transcript().is_empty());
        assert_eq!(app.controller.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_attach_command() {
        let mut app = test_app();
        type_text(&mut app, "/attach docs/run.exe");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert!(app.controller.transcript().is_empty());
        assert!(app.status.as_ref().unwrap().is_warning);

        app.set_input_text("");
        app.input_cursor = 0;
        type_text(&mut app, "/attach docs/notes.md");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert_eq!(app.controller.transcript().len(), 1);
        assert_eq!(app.controller.transcript().get(0).unwrap().text, "uploaded: notes.md");
        assert_eq!(app.controller.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_edit_flow_through_keys() {
        let mut app = test_app();
        type_text(&mut app, "first");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        app.controller.settle().await;

        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);

        // Editing a bot reply is refused
        handle_event(&mut app, key(KeyCode::Char('j'))).unwrap();
        assert_eq!(app.selected, Some(1));
        handle_event(&mut app, key(KeyCode::Char('e'))).unwrap();
        assert!(app.status.as_ref().unwrap().is_warning);
        assert!(!app.is_editing_message());

        handle_event(&mut app, key(KeyCode::Char('k'))).unwrap();
        handle_event(&mut app, key(KeyCode::Char('e'))).unwrap();
        assert!(app.is_editing_message());
        assert_eq!(app.input_mode, InputMode::Editing);
        assert_eq!(app.input_cursor, 5);

        type_text(&mut app, "!");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert!(!app.is_editing_message());
        assert_eq!(app.controller.transcript().get(0).unwrap().text, "first!");

        app.controller.settle().await;
        assert_eq!(app.controller.transcript().len(), 3);
        assert_eq!(app.controller.transcript().last().unwrap().text, "echo: first!");
    }

    #[tokio::test]
    async fn test_escape_cancels_edit() {
        let mut app = test_app();
        app.controller.submit("keep me");
        app.input_mode = InputMode::Normal;
        app.selected = Some(0);

        handle_event(&mut app, key(KeyCode::Char('e'))).unwrap();
        type_text(&mut app, " not");
        handle_event(&mut app, key(KeyCode::Esc)).unwrap();

        assert!(!app.is_editing_message());
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.controller.transcript().get(0).unwrap().text, "keep me");
    }
}
