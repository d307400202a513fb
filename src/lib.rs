pub mod app;
pub mod client;
pub mod config;
pub mod handler;
pub mod state;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use app::{App, InputMode};
pub use client::CompanionClient;
pub use config::Config;
pub use state::{ChatMessage, ChatRole, PendingReply, ERROR_TEXT, PLACEHOLDER_TEXT};
