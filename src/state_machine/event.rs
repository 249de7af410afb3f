//! Events that can occur in a session

use super::state::DialogOption;
use chrono::{DateTime, Utc};

/// Events that trigger state transitions
///
/// Anything that depends on the clock carries `now`, keeping `transition` pure.
#[derive(Debug, Clone)]
pub enum Event {
    /// Seed the welcome message and start the timer
    Init { now: DateTime<Utc> },

    // User events
    SelectOption { option: DialogOption },
    SubmitText { text: String },
    EndChat { now: DateTime<Utc> },
    Reset { now: DateTime<Utc> },

    // Reply stream events, tagged with the generation that requested them
    ReplyDelta { generation: u64, text: String },
    ReplyComplete { generation: u64, text: String },
    ReplyFailed { generation: u64, message: String },

    // Timer
    Tick { now: DateTime<Utc> },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Init { .. } => "init",
            Event::SelectOption { .. } => "select_option",
            Event::SubmitText { .. } => "submit_text",
            Event::EndChat { .. } => "end_chat",
            Event::Reset { .. } => "reset",
            Event::ReplyDelta { .. } => "reply_delta",
            Event::ReplyComplete { .. } => "reply_complete",
            Event::ReplyFailed { .. } => "reply_failed",
            Event::Tick { .. } => "tick",
        }
    }
}
