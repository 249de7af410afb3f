//! Transcript store
//!
//! Ordered, append-biased list of messages. Insertion order is display order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text of the synthetic message seeded into every fresh transcript
pub const WELCOME_MESSAGE: &str =
    "Welcome to DU Desk AI Chat Assistant! How can I assist you today?";

/// Prefix rendered in front of the first assistant message of a session
pub const GREETING_PREFIX: &str = "Hello. ";

/// Identity of a message, only used for list rendering.
///
/// Allocated from a per-session counter that survives resets, so an id is
/// never handed out twice within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    content: String,
    /// Render with [`GREETING_PREFIX`]. Decided once, when the message is created.
    pub greeting: bool,
    /// Content may still grow. Only the tail message can be streaming.
    pub streaming: bool,
}

impl Message {
    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            content: content.into(),
            greeting: false,
            streaming: false,
        }
    }

    pub fn assistant(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: content.into(),
            greeting: false,
            streaming: false,
        }
    }

    #[must_use]
    pub fn with_greeting(mut self, greeting: bool) -> Self {
        self.greeting = greeting;
        self
    }

    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Errors from mutating a transcript
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscriptError {
    #[error("no streaming message at the end of the transcript")]
    NotStreaming,
    #[error("a streaming message is already open")]
    AlreadyStreaming,
}

/// Ordered sequence of messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Whether the user has said anything yet
    pub fn has_user_message(&self) -> bool {
        self.messages.iter().any(Message::is_user)
    }

    /// Append a finished message.
    ///
    /// Refused while a streaming message is open so the stream stays at the tail.
    pub fn push(&mut self, message: Message) -> Result<(), TranscriptError> {
        if self.streaming_tail().is_some() {
            return Err(TranscriptError::AlreadyStreaming);
        }
        self.messages.push(message);
        Ok(())
    }

    /// Append a user message and its scripted answer as one unit
    pub fn push_exchange(&mut self, user: Message, assistant: Message) -> Result<(), TranscriptError> {
        if self.streaming_tail().is_some() {
            return Err(TranscriptError::AlreadyStreaming);
        }
        self.messages.extend([user, assistant]);
        Ok(())
    }

    /// The open streaming message, if any
    pub fn streaming_tail(&self) -> Option<&Message> {
        self.messages.last().filter(|m| m.streaming)
    }

    /// Extend the open streaming message
    pub fn extend_streaming(&mut self, delta: &str) -> Result<(), TranscriptError> {
        match self.messages.last_mut() {
            Some(m) if m.streaming => {
                m.content.push_str(delta);
                Ok(())
            }
            _ => Err(TranscriptError::NotStreaming),
        }
    }

    /// Freeze the open streaming message with its authoritative full text
    pub fn finish_streaming(&mut self, full_text: String) -> Result<(), TranscriptError> {
        match self.messages.last_mut() {
            Some(m) if m.streaming => {
                m.content = full_text;
                m.streaming = false;
                Ok(())
            }
            _ => Err(TranscriptError::NotStreaming),
        }
    }

    /// Drop a partially streamed reply. No-op when nothing is streaming.
    pub fn discard_streaming(&mut self) -> Option<Message> {
        if self.streaming_tail().is_some() {
            self.messages.pop()
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
