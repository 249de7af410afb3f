//! Session state types

use super::timer::ZERO_ELAPSED;
use crate::transcript::{Message, MessageId, Transcript};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Guided dialogue
// ============================================================================

/// Position in the scripted decision tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueStep {
    #[default]
    Initial,
    EligibilityBoard,
    /// Scripted flow ends here; the answer goes to the model as free text
    StateBoardInquiry,
    EligibilitySubjects,
    EligibilityCourses,
    ExploreColleges,
}

/// A preset answer the user can click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogOption {
    CheckEligibility,
    ExploreColleges,
    Cbse,
    Icse,
    StateBoard,
    FiveSubjects,
    SixSubjects,
}

impl DialogOption {
    pub const ALL: [DialogOption; 7] = [
        DialogOption::CheckEligibility,
        DialogOption::ExploreColleges,
        DialogOption::Cbse,
        DialogOption::Icse,
        DialogOption::StateBoard,
        DialogOption::FiveSubjects,
        DialogOption::SixSubjects,
    ];

    /// Button text, also used verbatim as the user message
    pub fn label(self) -> &'static str {
        match self {
            DialogOption::CheckEligibility => "Check Eligibility",
            DialogOption::ExploreColleges => "Explore Colleges",
            DialogOption::Cbse => "CBSE",
            DialogOption::Icse => "ICSE",
            DialogOption::StateBoard => "State Board",
            DialogOption::FiveSubjects => "5",
            DialogOption::SixSubjects => "6",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|o| o.label() == label)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Timer and visibility flags of one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Set when the welcome message is seeded, cleared only by a reset
    pub start_time: Option<DateTime<Utc>>,
    /// `mm:ss`
    pub elapsed_time: String,
    pub chat_ended: bool,
    /// The root menu is offered until the user says something
    pub options_visible: bool,
    /// The one-time greeting has been handed to a message
    pub first_message_decorated: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            start_time: None,
            elapsed_time: ZERO_ELAPSED.to_string(),
            chat_ended: false,
            options_visible: true,
            first_message_decorated: false,
        }
    }
}

/// Everything the controller owns for one conversation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    pub transcript: Transcript,
    pub state: SessionState,
    pub step: DialogueStep,
    /// A reply request is in flight
    pub loading: bool,
    /// Bumped by every reset; replies from older generations are dropped
    pub generation: u64,
    next_message_id: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh conversation that keeps the id counter and bumps the generation
    #[must_use]
    pub fn successor(&self) -> Self {
        Self {
            generation: self.generation + 1,
            next_message_id: self.next_message_id,
            ..Self::default()
        }
    }

    fn allocate_id(&mut self) -> MessageId {
        self.next_message_id += 1;
        MessageId(self.next_message_id)
    }

    pub fn user_message(&mut self, content: impl Into<String>) -> Message {
        let id = self.allocate_id();
        Message::user(id, content)
    }

    /// New assistant message; the first one of the session takes the greeting
    pub fn assistant_message(&mut self, content: impl Into<String>) -> Message {
        let id = self.allocate_id();
        let greeting = !self.state.first_message_decorated;
        self.state.first_message_decorated = true;
        Message::assistant(id, content).with_greeting(greeting)
    }

    /// Options offered for the current step
    pub fn available_options(&self) -> Vec<DialogOption> {
        if self.state.chat_ended {
            return vec![];
        }
        match self.step {
            DialogueStep::Initial if self.state.options_visible => {
                vec![DialogOption::CheckEligibility, DialogOption::ExploreColleges]
            }
            DialogueStep::EligibilityBoard => {
                vec![DialogOption::Cbse, DialogOption::Icse, DialogOption::StateBoard]
            }
            DialogueStep::EligibilitySubjects => {
                vec![DialogOption::FiveSubjects, DialogOption::SixSubjects]
            }
            _ => vec![],
        }
    }

    /// The typing indicator mirrors the in-flight request
    pub fn typing(&self) -> bool {
        self.loading
    }

    pub fn input_enabled(&self) -> bool {
        !self.loading && !self.state.chat_ended
    }

    pub fn timer_running(&self) -> bool {
        self.state.start_time.is_some() && !self.state.chat_ended
    }
}

/// Per-session configuration, fixed for the session's lifetime
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    /// Linked from the end-of-chat message
    pub canonical_url: String,
    /// UI theme tag forwarded to the chat endpoint
    pub theme: String,
    pub username: String,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, canonical_url: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            canonical_url: canonical_url.into(),
            theme: "light".to_string(),
            username: "guest".to_string(),
        }
    }

    #[must_use]
    pub fn with_identity(mut self, theme: impl Into<String>, username: impl Into<String>) -> Self {
        self.theme = theme.into();
        self.username = username.into();
        self
    }
}
