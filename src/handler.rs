use anyhow::{Result, anyhow};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::app::{App, InputMode};
use crate::client::CompanionClient;
use crate::state::PendingReply;
use crate::tui::AppEvent;

/// Where submitted messages go: the backend client plus the channel its
/// replies come back on
pub struct Dispatcher {
    pub client: CompanionClient,
    pub replies: UnboundedSender<AppEvent>,
}

impl Dispatcher {
    pub fn new(client: CompanionClient, replies: UnboundedSender<AppEvent>) -> Self {
        Self { client, replies }
    }

    /// Issue exactly one request for a submission. Nothing tracks the task;
    /// its reply arrives as an `AppEvent::Reply`.
    pub fn dispatch(&self, pending: PendingReply, message: String) {
        let client = self.client.clone();
        let replies = self.replies.clone();
        tokio::spawn(async move {
            let result = client.ask(&message).await;
            // Receiver is gone once the app quits
            let _ = replies.send(AppEvent::Reply { pending, result });
        });
    }
}

/// Outcome of a submission made without the terminal UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessReply {
    /// What the placeholder settled to: the reply or the fixed error text
    pub text: String,
    pub failed: bool,
}

/// Run one submission through the same submit/resolve path as the TUI
pub async fn ask_once(client: &CompanionClient, message: &str) -> Result<HeadlessReply> {
    let mut app = App::new(client.base_url());
    app.input = message.to_string();

    let Some((pending, message)) = app.submit() else {
        return Err(anyhow!("Message is empty"));
    };

    let result = client.ask(&message).await;
    let failed = result.is_err();
    app.resolve(pending, result);

    Ok(HeadlessReply {
        text: app.messages[pending.index()].text.clone(),
        failed,
    })
}

pub fn handle_event(app: &mut App, event: AppEvent, dispatcher: &Dispatcher) {
    match event {
        AppEvent::Key(key) => handle_key(app, key, dispatcher),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.scroll_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply { pending, result } => app.resolve(pending, result),
    }
}

fn handle_key(app: &mut App, key: KeyEvent, dispatcher: &Dispatcher) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key, dispatcher),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,

        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down((app.chat_height / 2).max(1));
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up((app.chat_height / 2).max(1));
        }
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent, dispatcher: &Dispatcher) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => {
            // Overlapping submissions are allowed
            if let Some((pending, message)) = app.submit() {
                dispatcher.dispatch(pending, message);
            }
        }
        KeyCode::Backspace => app.delete_before_cursor(),
        KeyCode::Delete => app.delete_at_cursor(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

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
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
