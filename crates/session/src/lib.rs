//! Conversation transcript for one interactive session
//!
//! Held in memory only; a new session starts from the greeting again.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Synthetic assistant message every session starts with
pub const GREETING: &str = "How can I help you plan your next trip?";

/// Who said it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    timestamp: DateTime<Local>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// Wire form for the LLM provider
    pub fn to_provider(&self) -> concierge_provider::Message {
        match self.role {
            Role::User => concierge_provider::Message::user(&self.content),
            Role::Assistant => concierge_provider::Message::assistant(&self.content),
        }
    }
}

/// Append-only, chronologically ordered session transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
    created_at: DateTime<Local>,
    updated_at: DateTime<Local>,
}

impl Transcript {
    /// New transcript holding only the greeting
    pub fn new() -> Self {
        let now = Local::now();
        Self {
            messages: vec![Message::assistant(GREETING)],
            created_at: now,
            updated_at: now,
        }
    }

    /// Start a fresh session
    pub fn reset(&mut self) {
        debug!("Resetting transcript of {} messages", self.messages.len());
        *self = Self::new();
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Local::now();
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.append(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.append(Message::assistant(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Every message but the newest. The newest is passed as the current
    /// turn's input, so it must not also appear in the history.
    pub fn snapshot_excluding_last(&self) -> &[Message] {
        match self.messages.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Local> {
        self.updated_at
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a history slice to provider messages, preserving order
pub fn history_for_provider(history: &[Message]) -> Vec<concierge_provider::Message> {
    history.iter().map(Message::to_provider).collect()
}
