//! Mock implementations for testing
//!
//! These mocks enable integration testing of the session runtime without
//! real I/O.

use super::traits::*;
use crate::protocol::{ChatRequest, DataStreamPart, FinishReason, ProtocolError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Mock Chat Endpoint
// ============================================================================

/// One scripted reply
pub enum MockReply {
    /// Stream these parts, then end
    Parts(Vec<Result<DataStreamPart, ProtocolError>>),
    /// Refuse the request outright
    Fail(u16),
    /// Wait for the gate, then stream the parts
    Gated(Arc<Notify>, Vec<DataStreamPart>),
}

impl MockReply {
    /// A well-formed reply made of the given text deltas
    pub fn text(deltas: &[&str]) -> Self {
        let mut parts = vec![Ok(DataStreamPart::StartStep {
            message_id: "mock".to_string(),
        })];
        parts.extend(deltas.iter().map(|d| Ok(DataStreamPart::Text((*d).to_string()))));
        parts.push(Ok(DataStreamPart::Finish {
            finish_reason: FinishReason::Stop,
            usage: None,
        }));
        MockReply::Parts(parts)
    }
}

/// Mock chat endpoint that returns queued replies
pub struct MockChatEndpoint {
    replies: Mutex<VecDeque<MockReply>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatEndpoint {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self, reply: MockReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockChatEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatEndpoint for MockChatEndpoint {
    async fn open(&self, request: &ChatRequest) -> Result<PartStream, DeliveryError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(MockReply::Parts(parts)) => {
                let parts = parts.into_iter().map(|p| p.map_err(DeliveryError::from));
                Ok(Box::pin(futures::stream::iter(parts)))
            }
            Some(MockReply::Fail(status)) => Err(DeliveryError::Status(status)),
            Some(MockReply::Gated(gate, parts)) => {
                gate.notified().await;
                let parts = parts.into_iter().map(Ok::<_, DeliveryError>);
                Ok(Box::pin(futures::stream::iter(parts)))
            }
            None => Err(DeliveryError::Transport("No mock reply queued".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::SessionView;
    use crate::runtime::{RuntimeManager, SessionDefaults, SessionHandle, DEFAULT_IDLE_TIMEOUT};
    use crate::sanitize::SanitizeConfig;
    use crate::state_machine::{DialogOption, Event, FALLBACK_REPLY};
    use crate::transcript::Role;
    use chrono::Utc;
    use std::time::Duration;

    fn manager(endpoint: Arc<MockChatEndpoint>) -> RuntimeManager {
        manager_with_idle(endpoint, DEFAULT_IDLE_TIMEOUT)
    }

    fn manager_with_idle(endpoint: Arc<MockChatEndpoint>, idle_timeout: Duration) -> RuntimeManager {
        RuntimeManager::new(
            endpoint,
            SessionDefaults {
                sanitize: SanitizeConfig::default(),
                theme: "light".to_string(),
                username: "guest".to_string(),
                idle_timeout,
            },
        )
    }

    async fn send(handle: &SessionHandle, event: Event) {
        handle.event_tx.send(event).await.unwrap();
    }

    /// Wait until a published view satisfies `f`
    async fn wait_for(handle: &SessionHandle, f: impl FnMut(&SessionView) -> bool) -> SessionView {
        let mut rx = handle.view_rx.clone();
        let view = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(f))
            .await
            .expect("timed out waiting for view")
            .expect("runtime stopped")
            .clone();
        view
    }

    /// Let the runtime drain its queue
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_mock_endpoint_replays_queue() {
        let mock = MockChatEndpoint::new();
        mock.queue(MockReply::Fail(500));
        let request = ChatRequest {
            messages: vec![],
            theme: "light".into(),
            username: "guest".into(),
        };

        assert!(matches!(
            mock.open(&request).await,
            Err(DeliveryError::Status(500))
        ));
        assert!(matches!(
            mock.open(&request).await,
            Err(DeliveryError::Transport(_))
        ));
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_new_session_shows_welcome() {
        let rt = manager(Arc::new(MockChatEndpoint::new()));
        let handle = rt.create_session().await.unwrap();

        let view = handle.view();
        assert_eq!(view.session_id, handle.session_id);
        assert_eq!(view.messages.len(), 1);
        assert!(view.messages[0].html.starts_with("Hello. Welcome to DU Desk"));
        assert_eq!(view.options, vec!["Check Eligibility", "Explore Colleges"]);
        assert_eq!(rt.session_count().await, 1);
        assert!(rt.get(&handle.session_id).await.is_some());
    }

    #[tokio::test]
    async fn test_guided_option_through_runtime() {
        let rt = manager(Arc::new(MockChatEndpoint::new()));
        let handle = rt.create_session().await.unwrap();

        rt.send_event(
            &handle.session_id,
            Event::SelectOption {
                option: DialogOption::CheckEligibility,
            },
        )
        .await
        .unwrap();

        let view = wait_for(&handle, |v| v.messages.len() == 3).await;
        assert_eq!(view.messages[1].html, "Check Eligibility");
        assert_eq!(
            view.messages[2].html,
            "From which board have you attempted your 12th exam?"
        );
        assert_eq!(view.options, vec!["CBSE", "ICSE", "State Board"]);
    }

    #[tokio::test]
    async fn test_streamed_reply_lands_in_transcript() {
        let endpoint = Arc::new(MockChatEndpoint::new());
        endpoint.queue(MockReply::text(&["Good day! ", "You are **eligible**."]));
        let rt = manager(endpoint.clone());
        let handle = rt.create_session().await.unwrap();

        send(&handle, Event::SubmitText { text: "Am I eligible?".into() }).await;

        let view = wait_for(&handle, |v| v.messages.len() == 3 && !v.typing).await;
        assert_eq!(view.messages[2].role, Role::Assistant);
        assert_eq!(view.messages[2].html, "Hello! You are eligible.");
        assert!(!view.messages[2].streaming);
        assert!(view.input_enabled);
        assert!(view.footer_note.is_some());
        assert!(view.options.is_empty());

        let requests = endpoint.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[0].messages[1].content, "Am I eligible?");
    }

    #[tokio::test]
    async fn test_delivery_failure_shows_fallback() {
        let endpoint = Arc::new(MockChatEndpoint::new());
        endpoint.queue(MockReply::Fail(500));
        let rt = manager(endpoint);
        let handle = rt.create_session().await.unwrap();

        send(&handle, Event::SubmitText { text: "hello".into() }).await;

        let view = wait_for(&handle, |v| v.messages.len() == 3 && !v.typing).await;
        assert_eq!(view.messages[2].html, FALLBACK_REPLY);
        assert!(view.input_enabled);
    }

    #[tokio::test]
    async fn test_error_part_discards_partial_reply() {
        let endpoint = Arc::new(MockChatEndpoint::new());
        endpoint.queue(MockReply::Parts(vec![
            Ok(DataStreamPart::Text("half an ans".into())),
            Ok(DataStreamPart::Error("upstream quota".into())),
        ]));
        let rt = manager(endpoint);
        let handle = rt.create_session().await.unwrap();

        send(&handle, Event::SubmitText { text: "hello".into() }).await;

        let view = wait_for(&handle, |v| !v.typing && v.messages.len() >= 3).await;
        assert_eq!(view.messages.len(), 3);
        assert_eq!(view.messages[2].html, FALLBACK_REPLY);
        assert!(view.messages.iter().all(|m| !m.html.contains("half an ans")));
    }

    #[tokio::test]
    async fn test_ended_chat_ignores_input() {
        let endpoint = Arc::new(MockChatEndpoint::new());
        let rt = manager(endpoint.clone());
        let handle = rt.create_session().await.unwrap();

        send(&handle, Event::EndChat { now: Utc::now() }).await;
        let ended = wait_for(&handle, |v| v.chat_ended).await;
        assert!(ended.messages[1]
            .html
            .starts_with("Thank you for using DU Desk AI Chat Assistant!"));
        assert!(!ended.input_enabled);
        assert!(ended.options.is_empty());

        send(&handle, Event::SubmitText { text: "still there?".into() }).await;
        send(
            &handle,
            Event::SelectOption {
                option: DialogOption::CheckEligibility,
            },
        )
        .await;
        settle().await;

        assert_eq!(handle.view(), ended);
        assert!(endpoint.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_reply_after_reset_is_dropped() {
        let gate = Arc::new(Notify::new());
        let endpoint = Arc::new(MockChatEndpoint::new());
        endpoint.queue(MockReply::Gated(
            gate.clone(),
            vec![DataStreamPart::Text("stale answer".into())],
        ));
        let rt = manager(endpoint);
        let handle = rt.create_session().await.unwrap();

        send(&handle, Event::SubmitText { text: "question".into() }).await;
        wait_for(&handle, |v| v.typing).await;

        send(&handle, Event::Reset { now: Utc::now() }).await;
        let fresh = wait_for(&handle, |v| !v.typing && v.messages.len() == 1).await;

        gate.notify_one();
        settle().await;

        let view = handle.view();
        assert_eq!(view.messages, fresh.messages);
        assert!(view.input_enabled);
        assert_eq!(view.options.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let rt = manager(Arc::new(MockChatEndpoint::new()));
        let err = rt
            .send_event("missing", Event::Reset { now: Utc::now() })
            .await
            .unwrap_err();
        assert!(matches!(err, crate::runtime::RuntimeError::NotFound(_)));
        assert!(rt.subscribe("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_abandoned_sessions_are_released() {
        let rt = manager_with_idle(
            Arc::new(MockChatEndpoint::new()),
            Duration::from_millis(200),
        );
        let mut ids = Vec::new();
        let mut views = Vec::new();
        for _ in 0..20 {
            let handle = rt.create_session().await.unwrap();
            ids.push(handle.session_id.clone());
            views.push(handle.view_rx.clone());
        }
        assert_eq!(rt.session_count().await, 20);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(rt.session_count().await, 0);
        for id in &ids {
            assert!(rt.get(id).await.is_none());
        }
        // Stopped runtimes no longer tick or publish
        for view_rx in &views {
            assert!(view_rx.has_changed().is_err());
        }
        let err = rt
            .send_event(&ids[0], Event::Reset { now: Utc::now() })
            .await
            .unwrap_err();
        assert!(matches!(err, crate::runtime::RuntimeError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_activity_keeps_session_alive() {
        let rt = manager_with_idle(
            Arc::new(MockChatEndpoint::new()),
            Duration::from_millis(400),
        );
        let handle = rt.create_session().await.unwrap();

        for _ in 0..8 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            // Rejected events still count as activity
            send(&handle, Event::SubmitText { text: String::new() }).await;
        }
        assert!(rt.get(&handle.session_id).await.is_some());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(rt.get(&handle.session_id).await.is_none());
    }
}
