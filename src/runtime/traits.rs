//! Trait abstractions for runtime I/O
//!
//! The session runtime only needs one thing from the outside world: a way to
//! turn a chat request into a stream of reply parts. These traits enable
//! testing the executor with mock implementations.

use crate::accumulator::decode_parts;
use crate::chat::ChatService;
use crate::protocol::{ChatRequest, DataStreamPart, ProtocolError};
use async_trait::async_trait;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::Client;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::io::StreamReader;

/// Reply parts in arrival order
pub type PartStream = Pin<Box<dyn Stream<Item = Result<DataStreamPart, DeliveryError>> + Send>>;

/// The reply could not be delivered; the user sees the fallback message
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("chat endpoint answered HTTP {0}")]
    Status(u16),
    #[error("chat endpoint unreachable: {0}")]
    Transport(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("no chat endpoint configured")]
    Unavailable,
}

/// Source of assistant replies
#[async_trait]
pub trait ChatEndpoint: Send + Sync {
    /// Send the conversation so far and stream the reply
    async fn open(&self, request: &ChatRequest) -> Result<PartStream, DeliveryError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ChatEndpoint + ?Sized> ChatEndpoint for Arc<T> {
    async fn open(&self, request: &ChatRequest) -> Result<PartStream, DeliveryError> {
        (**self).open(request).await
    }
}

// ============================================================================
// Production implementations
// ============================================================================

/// Calls the in-process chat service directly
pub struct LocalChatEndpoint {
    chat: Arc<ChatService>,
}

impl LocalChatEndpoint {
    pub fn new(chat: Arc<ChatService>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl ChatEndpoint for LocalChatEndpoint {
    async fn open(&self, request: &ChatRequest) -> Result<PartStream, DeliveryError> {
        Ok(Box::pin(self.chat.stream_parts(request).map(Ok::<_, DeliveryError>)))
    }
}

/// Posts to a remote chat endpoint speaking the data stream protocol
pub struct HttpChatEndpoint {
    client: Client,
    url: String,
}

impl HttpChatEndpoint {
    pub fn new(url: impl Into<String>) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ChatEndpoint for HttpChatEndpoint {
    async fn open(&self, request: &ChatRequest) -> Result<PartStream, DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        let body = StreamReader::new(response.bytes_stream().map_err(std::io::Error::other));
        Ok(Box::pin(decode_parts(body).map_err(DeliveryError::from)))
    }
}

/// Stand-in when neither a model key nor a remote endpoint is configured
pub struct DisabledChatEndpoint;

#[async_trait]
impl ChatEndpoint for DisabledChatEndpoint {
    async fn open(&self, _request: &ChatRequest) -> Result<PartStream, DeliveryError> {
        Err(DeliveryError::Unavailable)
    }
}
