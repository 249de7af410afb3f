//! Pure state transition function
//!
//! Given the same session, context and event, `transition` always produces
//! the same result and performs no I/O. Rejected events leave the session
//! untouched; the runtime drops them silently.

use super::script;
use super::state::{DialogOption, Session, SessionContext};
use super::timer::elapsed_between;
use super::{Effect, Event};
use crate::protocol::ChatRequest;
use crate::transcript::{TranscriptError, WELCOME_MESSAGE};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Fixed reply shown when the chat endpoint cannot deliver
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong. Please try again later.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: Session) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Reasons an event is not applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("chat has ended")]
    ChatEnded,
    #[error("message is empty")]
    EmptyInput,
    #[error("a reply is still on its way")]
    Busy,
    #[error("option '{}' is not offered right now", .0.label())]
    OptionUnavailable(DialogOption),
    #[error("reply belongs to an earlier request")]
    StaleReply,
    #[error("session timer is not running")]
    TimerStopped,
    #[error("session already initialized")]
    AlreadyInitialized,
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
}

/// Pure transition function
pub fn transition(
    session: &Session,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::Init { now } => {
            if !session.transcript.is_empty() {
                return Err(TransitionError::AlreadyInitialized);
            }
            let mut next = session.clone();
            seed(&mut next, now)?;
            Ok(TransitionResult::new(next).with_effect(Effect::PublishView))
        }

        // ============================================================
        // Guided dialogue
        // ============================================================
        Event::SelectOption { option } => {
            if session.state.chat_ended {
                return Err(TransitionError::ChatEnded);
            }
            if session.loading {
                return Err(TransitionError::Busy);
            }
            if !session.available_options().contains(&option) {
                return Err(TransitionError::OptionUnavailable(option));
            }
            let (prompt, next_step) = script::answer(option);

            let mut next = session.clone();
            let user = next.user_message(option.label());
            let assistant = next.assistant_message(prompt);
            next.transcript.push_exchange(user, assistant)?;
            next.step = next_step;
            next.state.options_visible = false;
            Ok(TransitionResult::new(next).with_effect(Effect::PublishView))
        }

        // ============================================================
        // Free text goes to the chat endpoint, whatever the step
        // ============================================================
        Event::SubmitText { text } => {
            if session.state.chat_ended {
                return Err(TransitionError::ChatEnded);
            }
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyInput);
            }
            if session.loading {
                return Err(TransitionError::Busy);
            }

            let mut next = session.clone();
            let user = next.user_message(text);
            next.transcript.push(user)?;
            next.state.options_visible = false;
            next.loading = true;

            let request =
                ChatRequest::from_transcript(&next.transcript, &context.theme, &context.username);
            let generation = next.generation;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::RequestReply {
                    generation,
                    request,
                })
                .with_effect(Effect::PublishView))
        }

        // ============================================================
        // Reply stream
        // ============================================================
        Event::ReplyDelta { generation, text } => {
            ensure_current_reply(session, generation)?;
            let mut next = session.clone();
            if next.transcript.streaming_tail().is_some() {
                next.transcript.extend_streaming(&text)?;
            } else {
                let message = next.assistant_message(text).streaming();
                next.transcript.push(message)?;
            }
            Ok(TransitionResult::new(next).with_effect(Effect::PublishView))
        }

        Event::ReplyComplete { generation, text } => {
            ensure_current_reply(session, generation)?;
            let mut next = session.clone();
            if next.transcript.streaming_tail().is_some() {
                next.transcript.finish_streaming(text)?;
            } else {
                let message = next.assistant_message(text);
                next.transcript.push(message)?;
            }
            next.loading = false;
            Ok(TransitionResult::new(next).with_effect(Effect::PublishView))
        }

        Event::ReplyFailed { generation, .. } => {
            ensure_current_reply(session, generation)?;
            let mut next = session.clone();
            next.transcript.discard_streaming();
            let message = next.assistant_message(FALLBACK_REPLY);
            next.transcript.push(message)?;
            next.loading = false;
            Ok(TransitionResult::new(next).with_effect(Effect::PublishView))
        }

        // ============================================================
        // Timer and lifecycle
        // ============================================================
        Event::Tick { now } => {
            let Some(start) = session.state.start_time.filter(|_| session.timer_running()) else {
                return Err(TransitionError::TimerStopped);
            };
            let elapsed = elapsed_between(start, now);
            if elapsed == session.state.elapsed_time {
                return Ok(TransitionResult::new(session.clone()));
            }
            let mut next = session.clone();
            next.state.elapsed_time = elapsed;
            Ok(TransitionResult::new(next).with_effect(Effect::PublishView))
        }

        Event::EndChat { now } => {
            if session.state.chat_ended {
                return Err(TransitionError::ChatEnded);
            }
            if session.loading {
                return Err(TransitionError::Busy);
            }
            let mut next = session.clone();
            if let Some(start) = next.state.start_time {
                next.state.elapsed_time = elapsed_between(start, now);
            }
            let farewell = script::farewell(&next.state.elapsed_time, &context.canonical_url);
            let message = next.assistant_message(farewell);
            next.transcript.push(message)?;
            next.state.chat_ended = true;

            let elapsed = next.state.elapsed_time.clone();
            Ok(TransitionResult::new(next)
                .with_effect(Effect::SessionEnded { elapsed })
                .with_effect(Effect::PublishView))
        }

        Event::Reset { now } => {
            let mut next = session.successor();
            seed(&mut next, now)?;
            Ok(TransitionResult::new(next).with_effect(Effect::PublishView))
        }
    }
}

/// Seed the welcome message and start the clock
fn seed(session: &mut Session, now: DateTime<Utc>) -> Result<(), TransitionError> {
    let welcome = session.assistant_message(WELCOME_MESSAGE);
    session.transcript.push(welcome)?;
    session.state.start_time = Some(now);
    Ok(())
}

fn ensure_current_reply(session: &Session, generation: u64) -> Result<(), TransitionError> {
    if generation != session.generation || !session.loading {
        return Err(TransitionError::StaleReply);
    }
    Ok(())
}
