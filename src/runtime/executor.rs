//! Session runtime executor

use super::traits::ChatEndpoint;
use crate::accumulator::ReplyAccumulator;
use crate::protocol::ChatRequest;
use crate::render::SessionView;
use crate::sanitize::SanitizeConfig;
use crate::state_machine::{transition, Effect, Event, Session, SessionContext};
use chrono::Utc;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Owns one session and applies every event to it, one at a time
pub struct SessionRuntime<E>
where
    E: ChatEndpoint + 'static,
{
    context: SessionContext,
    session: Session,
    endpoint: Arc<E>,
    sanitize: Arc<SanitizeConfig>,
    event_rx: mpsc::Receiver<Event>,
    // Weak so the loop sees the channel close once every handle is gone
    event_tx: mpsc::WeakSender<Event>,
    view_tx: watch::Sender<SessionView>,
    idle_timeout: Duration,
}

impl<E> SessionRuntime<E>
where
    E: ChatEndpoint + 'static,
{
    pub fn new(
        context: SessionContext,
        session: Session,
        endpoint: Arc<E>,
        sanitize: Arc<SanitizeConfig>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::WeakSender<Event>,
        view_tx: watch::Sender<SessionView>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            context,
            session,
            endpoint,
            sanitize,
            event_rx,
            event_tx,
            view_tx,
            idle_timeout,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting session runtime");

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Ticks do not count as activity
        let idle = tokio::time::sleep(self.idle_timeout);
        tokio::pin!(idle);

        loop {
            let timer_running = self.session.timer_running();
            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(event) => {
                        idle.as_mut().reset(Instant::now() + self.idle_timeout);
                        self.process_event(event);
                    }
                    None => break,
                },
                _ = ticker.tick(), if timer_running => {
                    self.process_event(Event::Tick { now: Utc::now() });
                }
                () = &mut idle => {
                    tracing::info!(
                        session_id = %self.context.session_id,
                        idle_secs = self.idle_timeout.as_secs(),
                        "Session idle, stopping"
                    );
                    break;
                }
            }
        }

        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let kind = event.kind();
        let result = match transition(&self.session, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                // Rejected events leave the session as it was
                tracing::debug!(
                    session_id = %self.context.session_id,
                    event = kind,
                    reason = %e,
                    "Event ignored"
                );
                return;
            }
        };

        self.session = result.new_state;
        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::RequestReply {
                generation,
                request,
            } => {
                tracing::info!(
                    session_id = %self.context.session_id,
                    generation,
                    messages = request.messages.len(),
                    "Requesting reply"
                );
                let Some(event_tx) = self.event_tx.upgrade() else {
                    return;
                };
                let endpoint = Arc::clone(&self.endpoint);
                let session_id = self.context.session_id.clone();
                tokio::spawn(async move {
                    deliver_reply(&*endpoint, &request, generation, &event_tx, &session_id)
                        .await;
                });
            }
            Effect::PublishView => {
                let view = SessionView::render(&self.context.session_id, &self.session, &self.sanitize);
                self.view_tx.send_replace(view);
            }
            Effect::SessionEnded { elapsed } => {
                tracing::info!(
                    session_id = %self.context.session_id,
                    elapsed = %elapsed,
                    messages = self.session.transcript.len(),
                    "Chat ended"
                );
            }
        }
    }
}

/// Stream one reply into the session as events tagged with `generation`
async fn deliver_reply<E>(
    endpoint: &E,
    request: &ChatRequest,
    generation: u64,
    event_tx: &mpsc::Sender<Event>,
    session_id: &str,
) where
    E: ChatEndpoint + ?Sized,
{
    let outcome = match endpoint.open(request).await {
        Ok(mut parts) => {
            let mut acc = ReplyAccumulator::new();
            let mut failure = None;
            while let Some(part) = parts.next().await {
                match part {
                    Ok(part) => {
                        if let Some(text) = acc.apply(part) {
                            if event_tx
                                .send(Event::ReplyDelta { generation, text })
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }
                        if acc.is_settled() {
                            break;
                        }
                    }
                    Err(e) => {
                        failure = Some(e.to_string());
                        break;
                    }
                }
            }
            match failure {
                Some(message) => Err(message),
                None => acc.finish(),
            }
        }
        Err(e) => Err(e.to_string()),
    };

    let event = match outcome {
        Ok(text) => Event::ReplyComplete { generation, text },
        Err(message) => {
            tracing::warn!(session_id = %session_id, generation, error = %message, "Reply delivery failed");
            Event::ReplyFailed {
                generation,
                message,
            }
        }
    };
    let _ = event_tx.send(event).await;
}
