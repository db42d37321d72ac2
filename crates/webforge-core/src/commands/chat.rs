//! Chat transcript
//!
//! Messages alternate between the user's prompts and the assistant's replies.
//! An assistant message is created empty while its generation is in flight and
//! is finalized in place once the request completes or fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ERROR_MARKER;

/// Message role in the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    #[default]
    User,
    Assistant,
}

impl MessageRole {
    /// Convert to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique message identifier
    pub id: String,
    /// Who wrote the message
    pub role: MessageRole,
    /// Message text; generated code for assistant messages
    pub content: String,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
    /// True while the assistant reply is still being generated
    #[serde(default)]
    pub is_generating: bool,
}

impl ChatMessage {
    /// Create a user prompt
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            is_generating: false,
        }
    }

    /// Create the empty assistant message shown while a generation runs
    pub fn assistant_placeholder() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            is_generating: true,
        }
    }

    /// Finalize with the generated content
    pub fn complete(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.is_generating = false;
    }

    /// Finalize with an error indicator
    pub fn fail(&mut self, message: &str) {
        self.content = format!("{} {}", ERROR_MARKER, message);
        self.is_generating = false;
    }

    /// Whether this message ended in an error
    pub fn is_error(&self) -> bool {
        self.role == MessageRole::Assistant && self.content.starts_with(ERROR_MARKER)
    }
}
