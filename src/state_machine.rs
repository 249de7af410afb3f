//! Core session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
mod script;
pub mod state;
pub mod timer;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{DialogOption, Session, SessionContext};
pub use transition::{transition, TransitionError, FALLBACK_REPLY};
