//! The chat endpoint's reply pipeline
//!
//! Turns a [`ChatRequest`] into an LLM request (system prompt, attached
//! datasets, history) and frames the model's streamed reply as data stream
//! parts.

use crate::llm::{Attachment, LlmChunk, LlmMessage, LlmRequest, LlmService};
use crate::protocol::{ChatRequest, DataStreamPart, FinishReason, TokenUsage};
use crate::system_prompt::{build_system_prompt, ReferenceData, CSV_MIME_TYPE};
use crate::transcript::Role;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

pub struct ChatService {
    llm: Arc<dyn LlmService>,
    data: Arc<ReferenceData>,
}

impl ChatService {
    pub fn new(llm: Arc<dyn LlmService>, data: ReferenceData) -> Self {
        Self {
            llm,
            data: Arc::new(data),
        }
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    pub fn build_request(&self, request: &ChatRequest) -> LlmRequest {
        LlmRequest {
            system: build_system_prompt(&request.theme, &request.username, &self.data),
            attachments: self
                .data
                .datasets()
                .iter()
                .map(|d| Attachment {
                    mime_type: CSV_MIME_TYPE.to_string(),
                    data: d.to_base64(),
                })
                .collect(),
            messages: request
                .messages
                .iter()
                .map(|m| match m.role {
                    Role::User => LlmMessage::user(&m.content),
                    Role::Assistant => LlmMessage::assistant(&m.content),
                })
                .collect(),
            max_tokens: None,
        }
    }

    /// Stream the reply as protocol parts.
    ///
    /// A model that fails before sending anything yields one error part and
    /// a finish part with reason `error`. Dropping the stream stops the
    /// upstream request.
    pub fn stream_parts(&self, request: &ChatRequest) -> ReceiverStream<DataStreamPart> {
        let (tx, rx) = mpsc::channel(32);
        let llm = Arc::clone(&self.llm);
        let llm_request = self.build_request(request);

        tokio::spawn(async move {
            let mut upstream = match llm.stream(&llm_request).await {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = tx.send(DataStreamPart::Error(e.message)).await;
                    let _ = tx.send(finish(FinishReason::Error, None)).await;
                    return;
                }
            };

            let message_id = format!("msg-{}", uuid::Uuid::new_v4().simple());
            if tx.send(DataStreamPart::StartStep { message_id }).await.is_err() {
                return;
            }

            let mut finish_reason = FinishReason::Unknown;
            let mut usage = None;
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(LlmChunk {
                        text,
                        finish_reason: reason,
                        usage: chunk_usage,
                    }) => {
                        if !text.is_empty() && tx.send(DataStreamPart::Text(text)).await.is_err() {
                            tracing::debug!("Chat client went away, dropping upstream stream");
                            return;
                        }
                        finish_reason = reason.unwrap_or(finish_reason);
                        usage = chunk_usage.map(TokenUsage::from).or(usage);
                    }
                    Err(e) => {
                        let _ = tx.send(DataStreamPart::Error(e.message)).await;
                        finish_reason = FinishReason::Error;
                        break;
                    }
                }
            }

            let _ = tx.send(DataStreamPart::FinishStep { finish_reason }).await;
            let _ = tx.send(finish(finish_reason, usage)).await;
        });

        ReceiverStream::new(rx)
    }
}

fn finish(finish_reason: FinishReason, usage: Option<TokenUsage>) -> DataStreamPart {
    DataStreamPart::Finish {
        finish_reason,
        usage,
    }
}
