use ratatui::layout::Rect;

use crate::state::{ChatMessage, PendingReply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Message input (the chat form)
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat window
    pub messages: Vec<ChatMessage>,
    pub scroll: u16,
    pub chat_height: u16,   // inner height of the chat pane, set during render
    pub content_lines: u16, // wrapped height of the transcript, set during render
    pub follow_bottom: bool,
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    /// Shown in the chat pane title
    pub backend_label: String,
}

impl App {
    pub fn new(backend_label: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            input: String::new(),
            cursor: 0,
            messages: Vec::new(),
            scroll: 0,
            chat_height: 0,
            content_lines: 0,
            follow_bottom: true,
            chat_area: None,
            animation_frame: 0,
            backend_label: backend_label.into(),
        }
    }

    /// Handle a submission of the message input.
    ///
    /// Whitespace-only input is ignored. Otherwise the trimmed message and a
    /// pending AI placeholder are appended, the input is cleared, and the
    /// placeholder handle is returned together with the text to send.
    pub fn submit(&mut self) -> Option<(PendingReply, String)> {
        let message = self.input.trim().to_string();
        if message.is_empty() {
            return None;
        }

        self.messages.push(ChatMessage::user(message.clone()));
        self.input.clear();
        self.cursor = 0;

        let pending = PendingReply(self.messages.len());
        self.messages.push(ChatMessage::placeholder());
        self.scroll_to_bottom();

        tracing::info!(placeholder = pending.index(), "message submitted");
        Some((pending, message))
    }

    /// Replace a placeholder with the outcome of its request
    pub fn resolve(&mut self, pending: PendingReply, result: anyhow::Result<String>) {
        let Some(msg) = self.messages.get_mut(pending.index()) else {
            tracing::warn!(placeholder = pending.index(), "reply for unknown placeholder");
            return;
        };
        if !msg.is_pending {
            tracing::warn!(placeholder = pending.index(), "placeholder already resolved");
            return;
        }

        match &result {
            Ok(reply) => tracing::info!(placeholder = pending.index(), len = reply.len(), "reply received"),
            Err(e) => tracing::warn!(placeholder = pending.index(), error = %e, "request failed"),
        }
        msg.settle(result);
        self.scroll_to_bottom();
    }

    /// Number of placeholders still waiting on a reply
    pub fn in_flight(&self) -> usize {
        self.messages.iter().filter(|m| m.is_pending).count()
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.in_flight() > 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Input editing

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete_at_cursor(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    // Chat window scrolling

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll());
        self.follow_bottom = self.scroll == self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.follow_bottom = self.scroll == self.max_scroll();
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
        self.follow_bottom = self.max_scroll() == 0;
    }

    /// Keep the newest message visible, including through the next render
    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
        self.scroll = self.max_scroll();
    }

    /// Record the chat pane size measured by the renderer.
    ///
    /// `content_lines` is the transcript height after word wrapping, so the
    /// bottom is only known here; a pending scroll to the bottom is applied
    /// against it.
    pub fn set_chat_size(&mut self, height: u16, content_lines: u16) {
        self.chat_height = height;
        self.content_lines = content_lines;
        if self.follow_bottom {
            self.scroll = self.max_scroll();
        } else {
            self.scroll = self.scroll.min(self.max_scroll());
        }
    }

    fn max_scroll(&self) -> u16 {
        self.content_lines.saturating_sub(self.chat_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ERROR_TEXT;
    use anyhow::anyhow;

    fn app_with_input(text: &str) -> App {
        let mut app = App::new("test");
        for c in text.chars() {
            app.insert_char(c);
        }
        app
    }

    #[test]
    fn test_submit_empty_is_noop() {
        let mut app = app_with_input("");
        assert!(app.submit().is_none());
        assert!(app.messages.is_empty());
    }

    #[test]
    fn test_submit_whitespace_is_noop() {
        let mut app = app_with_input("   \t ");
        assert!(app.submit().is_none());
        assert!(app.messages.is_empty());
        assert_eq!(app.input, "   \t ");
    }

    #[test]
    fn test_submit_appends_user_and_placeholder() {
        let mut app = app_with_input("  hi ");
        let (pending, message) = app.submit().unwrap();

        assert_eq!(message, "hi");
        assert_eq!(app.messages.len(), 2);
        assert_eq!(app.messages[0], ChatMessage::user("hi"));
        assert_eq!(app.messages[1], ChatMessage::placeholder());
        assert_eq!(pending.index(), 1);
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert_eq!(app.in_flight(), 1);
    }

    #[test]
    fn test_resolve_success() {
        let mut app = app_with_input("hi");
        let (pending, _) = app.submit().unwrap();
        app.resolve(pending, Ok("hello".to_string()));

        assert_eq!(app.messages[1].text, "hello");
        assert!(!app.messages[1].is_pending);
        assert_eq!(app.in_flight(), 0);
    }

    #[test]
    fn test_resolve_failure_shows_fixed_error() {
        let mut app = app_with_input("hi");
        let (pending, _) = app.submit().unwrap();
        app.resolve(pending, Err(anyhow!("Companion request failed with status: 500")));

        assert_eq!(app.messages[1].text, ERROR_TEXT);
        assert!(!app.messages[1].is_pending);
    }

    #[test]
    fn test_overlapping_submissions_resolve_out_of_order() {
        let mut app = app_with_input("first");
        let (first, _) = app.submit().unwrap();
        for c in "second".chars() {
            app.insert_char(c);
        }
        let (second, _) = app.submit().unwrap();
        assert_eq!(app.in_flight(), 2);

        app.resolve(second, Ok("reply two".to_string()));
        app.resolve(first, Ok("reply one".to_string()));

        let texts: Vec<&str> = app.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "reply one", "second", "reply two"]);
    }

    #[test]
    fn test_resolve_unknown_or_settled_is_ignored() {
        let mut app = app_with_input("hi");
        let (pending, _) = app.submit().unwrap();
        app.resolve(PendingReply(42), Ok("stray".to_string()));
        app.resolve(pending, Ok("hello".to_string()));
        app.resolve(pending, Ok("again".to_string()));
        app.resolve(PendingReply(0), Ok("not a placeholder".to_string()));

        assert_eq!(app.messages[0].text, "hi");
        assert_eq!(app.messages[1].text, "hello");
    }

    #[test]
    fn test_utf8_editing() {
        let mut app = app_with_input("héllo");
        app.cursor_left();
        app.cursor_left();
        app.cursor_left();
        app.delete_before_cursor();
        assert_eq!(app.input, "hllo");
        app.insert_char('é');
        assert_eq!(app.input, "héllo");
        app.cursor_home();
        app.delete_at_cursor();
        assert_eq!(app.input, "éllo");
        app.cursor_end();
        assert_eq!(app.cursor, 4);
    }

    #[test]
    fn test_tick_animates_only_while_waiting() {
        let mut app = app_with_input("hi");
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);

        let (pending, _) = app.submit().unwrap();
        app.tick_animation();
        assert_eq!(app.animation_frame, 1);
        app.tick_animation();
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);

        app.resolve(pending, Ok("hello".to_string()));
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);
    }

    #[test]
    fn test_scroll_follows_rendered_height() {
        let mut app = app_with_input("hi");
        app.submit();
        app.set_chat_size(4, 18);
        assert_eq!(app.scroll, 14);

        app.scroll_up(5);
        assert_eq!(app.scroll, 9);
        assert!(!app.follow_bottom);

        // A taller transcript does not move a reader who scrolled up
        app.set_chat_size(4, 30);
        assert_eq!(app.scroll, 9);

        app.scroll_down(1000);
        assert_eq!(app.scroll, 26);
        assert!(app.follow_bottom);
        app.set_chat_size(4, 40);
        assert_eq!(app.scroll, 36);
    }

    #[test]
    fn test_submit_resumes_following() {
        let mut app = app_with_input("hi");
        app.set_chat_size(4, 20);
        app.scroll_to_top();
        assert!(!app.follow_bottom);

        app.insert_char('x');
        app.submit();
        app.set_chat_size(4, 26);
        assert_eq!(app.scroll, 22);
    }
}
