//! API request and response types

use serde::{Deserialize, Serialize};

/// Pick one of the guided-dialogue buttons by its label
#[derive(Debug, Deserialize)]
pub struct OptionRequest {
    pub option: String,
}

/// Free-text question typed into the input box
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Response for session commands
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub queued: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
