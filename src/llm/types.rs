//! Common types for LLM interactions

use crate::protocol::{FinishReason, TokenUsage};

/// LLM request
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub system: String,
    /// Files sent ahead of the conversation in one user turn
    pub attachments: Vec<Attachment>,
    pub messages: Vec<LlmMessage>,
    pub max_tokens: Option<u32>,
}

/// Inline file content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub mime_type: String,
    /// Base64 encoded
    pub data: String,
}

/// Message in conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub text: String,
}

impl LlmMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// One increment of a streamed reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmChunk {
    pub text: String,
    /// Set on the last chunk of a candidate
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

impl LlmChunk {
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            text: s.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn finished(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }
}

/// Usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        TokenUsage {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
        }
    }
}
