//! Effects produced by state transitions

use crate::protocol::ChatRequest;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the chat endpoint for a reply; stream events carry `generation`
    RequestReply {
        generation: u64,
        request: ChatRequest,
    },

    /// Re-render the session for connected clients
    PublishView,

    /// The user ended the chat
    SessionEnded { elapsed: String },
}
