//! Runtime for executing sessions
//!
//! Each session runs in its own task. HTTP handlers talk to it through a
//! [`SessionHandle`]: events go in over an mpsc channel and rendered views
//! come out over a watch channel.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::render::SessionView;
use crate::sanitize::SanitizeConfig;
use crate::state_machine::{transition, Event, Session, SessionContext, TransitionError};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch, RwLock};

/// Sessions with no events for this long are stopped and forgotten
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Type alias for production runtime with a boxed endpoint
pub type ProductionRuntime = SessionRuntime<Arc<dyn ChatEndpoint>>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("session runtime has stopped")]
    Closed,
    #[error("failed to start session: {0}")]
    Init(#[from] TransitionError),
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub session_id: String,
    pub event_tx: mpsc::Sender<Event>,
    pub view_rx: watch::Receiver<SessionView>,
}

impl SessionHandle {
    pub fn view(&self) -> SessionView {
        self.view_rx.borrow().clone()
    }
}

/// Per-process settings every new session starts with
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    pub sanitize: SanitizeConfig,
    pub theme: String,
    pub username: String,
    pub idle_timeout: Duration,
}

/// Manager for all session runtimes
pub struct RuntimeManager {
    endpoint: Arc<dyn ChatEndpoint>,
    defaults: SessionDefaults,
    sanitize: Arc<SanitizeConfig>,
    runtimes: Arc<RwLock<HashMap<String, SessionHandle>>>,
}

impl RuntimeManager {
    pub fn new(endpoint: Arc<dyn ChatEndpoint>, defaults: SessionDefaults) -> Self {
        let sanitize = Arc::new(defaults.sanitize.clone());
        Self {
            endpoint,
            defaults,
            sanitize,
            runtimes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a fresh session with its welcome message in place
    pub async fn create_session(&self) -> Result<SessionHandle, RuntimeError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let context = SessionContext::new(&session_id, &self.defaults.sanitize.canonical_url)
            .with_identity(&self.defaults.theme, &self.defaults.username);

        // Seed before spawning so the first view already shows the welcome
        let seeded = transition(&Session::new(), &context, Event::Init { now: Utc::now() })?;
        let view = SessionView::render(&session_id, &seeded.new_state, &self.sanitize);

        let (event_tx, event_rx) = mpsc::channel(64);
        let (view_tx, view_rx) = watch::channel(view);

        let runtime: ProductionRuntime = SessionRuntime::new(
            context,
            seeded.new_state,
            Arc::new(Arc::clone(&self.endpoint)),
            Arc::clone(&self.sanitize),
            event_rx,
            event_tx.downgrade(),
            view_tx,
            self.defaults.idle_timeout,
        );

        let handle = SessionHandle {
            session_id: session_id.clone(),
            event_tx,
            view_rx,
        };
        // The task removes its own entry when it stops
        self.runtimes
            .write()
            .await
            .insert(session_id.clone(), handle.clone());

        let runtimes = Arc::clone(&self.runtimes);
        let id = session_id.clone();
        tokio::spawn(async move {
            runtime.run().await;
            runtimes.write().await.remove(&id);
            tracing::debug!(session_id = %id, "Session released");
        });

        tracing::info!(session_id = %session_id, "Session created");
        Ok(handle)
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.runtimes.read().await.get(session_id).cloned()
    }

    /// Send an event to a session
    pub async fn send_event(&self, session_id: &str, event: Event) -> Result<(), RuntimeError> {
        let handle = self
            .get(session_id)
            .await
            .ok_or_else(|| RuntimeError::NotFound(session_id.to_string()))?;
        handle
            .event_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::Closed)
    }

    /// Subscribe to rendered views of a session
    pub async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<watch::Receiver<SessionView>, RuntimeError> {
        self.get(session_id)
            .await
            .map(|h| h.view_rx)
            .ok_or_else(|| RuntimeError::NotFound(session_id.to_string()))
    }

    pub async fn session_count(&self) -> usize {
        self.runtimes.read().await.len()
    }
}
