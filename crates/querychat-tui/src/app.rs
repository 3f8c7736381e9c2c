use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use querychat_core::{Config, QueryBackend, Sender, TranscriptController};
use ratatui::style::Color;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            Theme::Dark => Palette {
                background: Color::Reset,
                text: Color::White,
                muted: Color::DarkGray,
                user: Color::Cyan,
                bot: Color::Yellow,
                accent: Color::Cyan,
                selection: Color::DarkGray,
            },
            Theme::Light => Palette {
                background: Color::White,
                text: Color::Black,
                muted: Color::Gray,
                user: Color::Blue,
                bot: Color::Magenta,
                accent: Color::Blue,
                selection: Color::Gray,
            },
        }
    }
}

/// Colors for one theme
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub background: Color,
    pub text: Color,
    pub muted: Color,
    pub user: Color,
    pub bot: Color,
    pub accent: Color,
    pub selection: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Liked,
    Disliked,
}

/// One-line notice shown in the footer until the next key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub is_warning: bool,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub controller: TranscriptController,
    pub endpoint: String,

    // Cursor position (in chars) within whichever buffer the input box shows
    pub input_cursor: usize,
    pub selected: Option<usize>,

    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of chat area
    pub chat_width: u16,  // inner width of chat area
    pub follow_tail: bool,

    pub animation_frame: u8,
    pub status: Option<Status>,
    pub feedback: HashMap<usize, Feedback>,
    pub theme: Theme,
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

impl App {
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        endpoint: &str,
        config: Config,
        config_path: Option<PathBuf>,
    ) -> Self {
        let theme = config
            .theme
            .as_deref()
            .and_then(Theme::from_str)
            .unwrap_or_default();

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            controller: TranscriptController::new(backend),
            endpoint: endpoint.to_string(),
            input_cursor: 0,
            selected: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_tail: true,
            animation_frame: 0,
            status: None,
            feedback: HashMap::new(),
            theme,
            config,
            config_path,
        }
    }

    /// Text shown in the input box: the edit draft while editing a message,
    /// the pending input otherwise.
    pub fn input_text(&self) -> &str {
        match self.controller.edit_slot() {
            Some(slot) => slot.draft.as_str(),
            None => self.controller.pending_input(),
        }
    }

    pub fn set_input_text(&mut self, text: &str) {
        if self.controller.edit_slot().is_some() {
            // Only fails without an edit slot, which was just checked
            let _ = self.controller.set_edit_draft(text);
        } else {
            self.controller.set_pending_input(text);
        }
    }

    pub fn is_editing_message(&self) -> bool {
        self.controller.edit_slot().is_some()
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            text: text.into(),
            is_warning: false,
        });
    }

    pub fn set_warning(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!(%text, "user warning");
        self.status = Some(Status {
            text,
            is_warning: true,
        });
    }

    /// Called on every tick: animate and pick up replies that have arrived.
    pub fn tick(&mut self) {
        if self.controller.in_flight() > 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if self.controller.drain_replies() > 0 && self.follow_tail {
            self.scroll_to_bottom();
        }
    }

    pub fn select_next(&mut self) {
        let len = self.controller.transcript().len();
        if len == 0 {
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) if i + 1 < len => i + 1,
            Some(i) => i,
            None => len - 1,
        });
    }

    pub fn select_prev(&mut self) {
        let len = self.controller.transcript().len();
        if len == 0 {
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) => i.saturating_sub(1),
            None => len - 1,
        });
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        self.config.theme = Some(self.theme.as_str().to_string());
        if let Some(path) = &self.config_path {
            if let Err(e) = self.config.save_to(path) {
                warn!(error = %e, "could not save theme");
            }
        }
    }

    /// Mark a bot message. Marking it again with the same feedback clears it.
    pub fn give_feedback(&mut self, index: usize, feedback: Feedback) -> bool {
        let Some(message) = self.controller.transcript().get(index) else {
            return false;
        };
        if message.sender != Sender::Bot {
            return false;
        }

        if self.feedback.get(&index) == Some(&feedback) {
            self.feedback.remove(&index);
        } else {
            tracing::info!(index, turn = %message.turn, ?feedback, "feedback recorded");
            self.feedback.insert(index, feedback);
        }
        true
    }

    /// Lines the transcript takes up at the current chat width, capped at
    /// what a `u16` scroll offset can address.
    pub fn transcript_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: usize = 0;
        for msg in self.controller.transcript() {
            total_lines = total_lines.saturating_add(1); // "You:" / "Bot:" line
            for line in msg.text.lines() {
                let char_count = line.chars().count();
                total_lines = total_lines.saturating_add(char_count / wrap_width + 1);
            }
            total_lines = total_lines.saturating_add(1); // blank line after message
        }

        if self.controller.in_flight() > 0 {
            total_lines = total_lines.saturating_add(2); // "Bot:" + "Thinking..."
        }

        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }

    pub fn scroll_to_bottom(&mut self) {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = self.transcript_line_count().saturating_sub(visible_height);
        self.follow_tail = true;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        let max_scroll = self.transcript_line_count().saturating_sub(visible_height);
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
        self.follow_tail = self.chat_scroll == max_scroll;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use querychat_core::QueryError;
    use serde_json::{json, Value};

    struct EchoBackend;

    #[async_trait]
    impl QueryBackend for EchoBackend {
        async fn query(&self, text: &str) -> Result<Value, QueryError> {
            Ok(json!({ "response": format!("echo: {text}") }))
        }
    }

    fn test_app() -> App {
        App::new(Arc::new(EchoBackend), "http://test/query", Config::new(), None)
    }

    #[test]
    fn test_theme_round_trip() {
        assert_eq!(Theme::from_str("LIGHT"), Some(Theme::Light));
        assert_eq!(Theme::from_str("sepia"), None);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);
        assert_eq!(Theme::from_str(Theme::Light.as_str()), Some(Theme::Light));
    }

    #[test]
    fn test_theme_from_config() {
        let config = Config {
            theme: Some("light".to_string()),
            ..Config::new()
        };
        let app = App::new(Arc::new(EchoBackend), "http://test/query", config, None);
        assert_eq!(app.theme, Theme::Light);
    }

    #[tokio::test]
    async fn test_tick_drains_replies() {
        let mut app = test_app();
        app.controller.submit("hello");
        app.controller.settle().await;
        assert_eq!(app.controller.transcript().len(), 2);

        app.controller.submit("again");
        while app.controller.in_flight() > 0 {
            tokio::task::yield_now().await;
            app.tick();
        }
        assert_eq!(app.controller.transcript().last().unwrap().text, "echo: again");
    }

    #[tokio::test]
    async fn test_feedback_only_on_bot_messages() {
        let mut app = test_app();
        app.controller.submit("hello");
        app.controller.settle().await;

        assert!(!app.give_feedback(0, Feedback::Liked));
        assert!(app.give_feedback(1, Feedback::Liked));
        assert_eq!(app.feedback.get(&1), Some(&Feedback::Liked));

        app.give_feedback(1, Feedback::Disliked);
        assert_eq!(app.feedback.get(&1), Some(&Feedback::Disliked));

        app.give_feedback(1, Feedback::Disliked);
        assert!(app.feedback.get(&1).is_none());
        assert!(!app.give_feedback(7, Feedback::Liked));
    }

    #[tokio::test]
    async fn test_input_text_follows_edit_slot() {
        let mut app = test_app();
        app.set_input_text("draft");
        assert_eq!(app.input_text(), "draft");

        app.controller.submit("original");
        app.controller.begin_edit(0).unwrap();
        assert_eq!(app.input_text(), "original");

        app.set_input_text("changed");
        assert_eq!(app.controller.edit_slot().unwrap().draft, "changed");
        assert_eq!(app.controller.pending_input(), "");
    }

    struct LongReplyBackend;

    #[async_trait]
    impl QueryBackend for LongReplyBackend {
        async fn query(&self, _text: &str) -> Result<Value, QueryError> {
            Ok(json!({ "response": "x\n".repeat(70_000) }))
        }
    }

    #[tokio::test]
    async fn test_long_reply_does_not_overflow_line_count() {
        let backend = Arc::new(LongReplyBackend);
        let mut app = App::new(backend, "http://test/query", Config::new(), None);
        app.controller.submit("hi");
        while app.controller.in_flight() > 0 {
            tokio::task::yield_now().await;
            app.tick();
        }

        assert_eq!(app.controller.transcript().len(), 2);
        assert_eq!(app.transcript_line_count(), u16::MAX);
        assert_eq!(app.chat_scroll, u16::MAX - 20);

        app.scroll_down(u16::MAX);
        assert_eq!(app.chat_scroll, u16::MAX - 20);
        assert!(app.follow_tail);
    }

    #[test]
    fn test_selection_clamps() {
        let mut app = test_app();
        app.select_next();
        assert_eq!(app.selected, None);
    }
}
