//! Wire format of the chat endpoint
//!
//! Requests are JSON. Replies use the line-oriented data stream protocol:
//! one part per line, a one-character type code, a colon, then a JSON payload.
//!
//! ```text
//! f:{"messageId":"msg-1"}
//! 0:"Hello"
//! 0:" there"
//! e:{"finishReason":"stop","isContinued":false}
//! d:{"finishReason":"stop","usage":{"promptTokens":10,"completionTokens":2}}
//! ```

use crate::transcript::{Role, Transcript};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Response header announcing the data stream protocol
pub const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";
pub const DATA_STREAM_VERSION: &str = "v1";

pub const DEFAULT_THEME: &str = "light";
pub const DEFAULT_USERNAME: &str = "guest";

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}

// ============================================================================
// Request
// ============================================================================

/// One prior message as sent to the endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_username")]
    pub username: String,
}

impl ChatRequest {
    /// Snapshot of the transcript in display order
    pub fn from_transcript(
        transcript: &Transcript,
        theme: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            messages: transcript
                .messages()
                .iter()
                .map(|m| ChatMessage {
                    role: m.role,
                    content: m.content().to_string(),
                })
                .collect(),
            theme: theme.into(),
            username: username.into(),
        }
    }
}

// ============================================================================
// Reply stream parts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
    Other,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// One line of a reply stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataStreamPart {
    StartStep { message_id: String },
    Text(String),
    Error(String),
    FinishStep { finish_reason: FinishReason },
    Finish {
        finish_reason: FinishReason,
        usage: Option<TokenUsage>,
    },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("stream line has no type prefix: {0:?}")]
    MissingPrefix(String),
    #[error("invalid payload for part '{code}': {source}")]
    InvalidPayload {
        code: char,
        #[source]
        source: serde_json::Error,
    },
    #[error("reading reply stream: {0}")]
    Io(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartStepPayload {
    message_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinishPayload {
    finish_reason: FinishReason,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

impl DataStreamPart {
    pub fn code(&self) -> char {
        match self {
            DataStreamPart::StartStep { .. } => 'f',
            DataStreamPart::Text(_) => '0',
            DataStreamPart::Error(_) => '3',
            DataStreamPart::FinishStep { .. } => 'e',
            DataStreamPart::Finish { .. } => 'd',
        }
    }

    /// Serialize as one protocol line, newline included
    pub fn encode(&self) -> String {
        let payload = match self {
            DataStreamPart::StartStep { message_id } => json!({ "messageId": message_id }),
            DataStreamPart::Text(text) | DataStreamPart::Error(text) => json!(text),
            DataStreamPart::FinishStep { finish_reason } => json!({
                "finishReason": finish_reason,
                "isContinued": false,
            }),
            DataStreamPart::Finish {
                finish_reason,
                usage,
            } => json!({
                "finishReason": finish_reason,
                "usage": usage.unwrap_or_default(),
            }),
        };
        format!("{}:{payload}\n", self.code())
    }

    /// Parse one line. Blank lines and part types we do not use yield `None`.
    pub fn decode(line: &str) -> Result<Option<Self>, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }
        let (code, payload) = line
            .split_once(':')
            .ok_or_else(|| ProtocolError::MissingPrefix(line.to_string()))?;
        let mut chars = code.chars();
        let (Some(code), None) = (chars.next(), chars.next()) else {
            return Err(ProtocolError::MissingPrefix(line.to_string()));
        };
        let invalid = |source: serde_json::Error| ProtocolError::InvalidPayload { code, source };

        let part = match code {
            'f' => {
                let p: StartStepPayload = serde_json::from_str(payload).map_err(invalid)?;
                DataStreamPart::StartStep {
                    message_id: p.message_id,
                }
            }
            '0' => DataStreamPart::Text(serde_json::from_str(payload).map_err(invalid)?),
            '3' => DataStreamPart::Error(serde_json::from_str(payload).map_err(invalid)?),
            'e' => {
                let p: FinishPayload = serde_json::from_str(payload).map_err(invalid)?;
                DataStreamPart::FinishStep {
                    finish_reason: p.finish_reason,
                }
            }
            'd' => {
                let p: FinishPayload = serde_json::from_str(payload).map_err(invalid)?;
                DataStreamPart::Finish {
                    finish_reason: p.finish_reason,
                    usage: p.usage,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(part))
    }
}
