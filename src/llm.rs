//! LLM provider abstraction
//!
//! Streams replies from the hosted model behind a common interface.

mod error;
mod gemini;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use gemini::{GeminiService, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use types::*;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Reply chunks in arrival order
pub type LlmStream = Pin<Box<dyn Stream<Item = Result<LlmChunk, LlmError>> + Send>>;

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Open a streaming completion
    async fn stream(&self, request: &LlmRequest) -> Result<LlmStream, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn stream(&self, request: &LlmRequest) -> Result<LlmStream, LlmError> {
        let start = Instant::now();
        let result = self.inner.stream(request).await;

        let stream = match result {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %start.elapsed().as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    transient = e.kind.is_transient(),
                    "LLM request failed"
                );
                return Err(e);
            }
        };

        tracing::debug!(
            model = %self.model_id,
            first_byte_ms = %start.elapsed().as_millis(),
            messages = request.messages.len(),
            "LLM stream opened"
        );

        let model = self.model_id.clone();
        let logged = stream.inspect(move |item| match item {
            Ok(chunk) => {
                if let Some(reason) = chunk.finish_reason {
                    tracing::info!(
                        model = %model,
                        duration_ms = %start.elapsed().as_millis(),
                        finish_reason = ?reason,
                        input_tokens = chunk.usage.map(|u| u.input_tokens),
                        output_tokens = chunk.usage.map(|u| u.output_tokens),
                        "LLM request completed"
                    );
                }
            }
            Err(e) => {
                tracing::error!(
                    model = %model,
                    duration_ms = %start.elapsed().as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "LLM stream failed"
                );
            }
        });
        Ok(Box::pin(logged))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
