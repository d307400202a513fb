//! Chat transcript types
//!
//! These don't depend on the terminal UI so the headless `ask` command and the
//! tests can use them directly.

use serde::{Deserialize, Serialize};

/// Text shown in an AI message while its reply is still in flight
pub const PLACEHOLDER_TEXT: &str = "...";

/// Text shown in place of a reply when the request fails for any reason
pub const ERROR_TEXT: &str = "Sorry, an error occurred. Please try again.";

/// A single message in the chat window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub role: ChatRole,
    pub is_pending: bool,
}

/// Who a chat message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Ai,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role: ChatRole::User,
            is_pending: false,
        }
    }

    /// A "thinking" placeholder that a reply will later replace
    pub fn placeholder() -> Self {
        Self {
            text: PLACEHOLDER_TEXT.to_string(),
            role: ChatRole::Ai,
            is_pending: true,
        }
    }

    /// Replace the placeholder content with the outcome of its request
    pub fn settle(&mut self, outcome: anyhow::Result<String>) {
        self.text = match outcome {
            Ok(reply) => reply,
            Err(_) => ERROR_TEXT.to_string(),
        };
        self.is_pending = false;
    }
}

/// Handle to the placeholder an in-flight request will resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingReply(pub(crate) usize);

impl PendingReply {
    pub fn index(&self) -> usize {
        self.0
    }
}
