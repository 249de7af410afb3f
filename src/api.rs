//! HTTP API for DU Desk
//!
//! Two surfaces share one router: the data-stream chat endpoint used by
//! remote clients, and the session endpoints the chat page drives.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::chat::ChatService;
use crate::runtime::RuntimeManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager>,
    /// Absent when no model key is configured; `/api/chat` then answers 503
    pub chat: Option<Arc<ChatService>>,
}

impl AppState {
    pub fn new(runtime: RuntimeManager, chat: Option<Arc<ChatService>>) -> Self {
        Self {
            runtime: Arc::new(runtime),
            chat,
        }
    }
}
