//! Google Gemini provider implementation
//!
//! Uses `streamGenerateContent` with `alt=sse`; every SSE event carries a
//! partial `GenerateContentResponse`.

use super::types::{LlmChunk, LlmRequest, MessageRole, Usage};
use super::{LlmError, LlmService, LlmStream};
use crate::protocol::FinishReason;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiService {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: Option<&str>,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    fn translate_request(request: &LlmRequest) -> GeminiRequest {
        let mut contents = Vec::with_capacity(request.messages.len() + 1);

        if !request.attachments.is_empty() {
            contents.push(GeminiContent {
                role: Some("user".to_string()),
                parts: request
                    .attachments
                    .iter()
                    .map(|a| GeminiPart::InlineData {
                        inline_data: GeminiBlob {
                            mime_type: a.mime_type.clone(),
                            data: a.data.clone(),
                        },
                    })
                    .collect(),
            });
        }

        for msg in &request.messages {
            if msg.text.is_empty() {
                continue;
            }
            let role = match msg.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "model",
            };
            contents.push(GeminiContent {
                role: Some(role.to_string()),
                parts: vec![GeminiPart::Text {
                    text: msg.text.clone(),
                }],
            });
        }

        let system_instruction = (!request.system.is_empty()).then(|| GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text {
                text: request.system.clone(),
            }],
        });

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: request.max_tokens.map(|max| GeminiGenerationConfig {
                max_output_tokens: Some(max),
            }),
        }
    }
}

/// Map one SSE `data` payload to a chunk. Payloads with nothing to report
/// yield `None`.
fn parse_event(data: &str) -> Result<Option<LlmChunk>, LlmError> {
    if data.trim().is_empty() {
        return Ok(None);
    }
    let resp: GeminiStreamResponse = serde_json::from_str(data)
        .map_err(|e| LlmError::unknown(format!("Failed to parse stream event: {e}")))?;

    if let Some(error) = resp.error {
        return Err(LlmError::from_status(
            error.code.unwrap_or(500),
            &error.message,
        ));
    }
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(LlmError::invalid_request(format!("Prompt blocked: {reason}")));
    }

    let mut chunk = LlmChunk::default();
    if let Some(candidate) = resp.candidates.into_iter().next() {
        if let Some(content) = candidate.content {
            chunk.text = content.parts.into_iter().filter_map(|p| p.text).collect();
        }
        chunk.finish_reason = candidate.finish_reason.as_deref().map(finish_reason);
    }
    chunk.usage = resp.usage_metadata.map(|u| Usage {
        input_tokens: u.prompt_token_count,
        output_tokens: u.candidates_token_count,
    });

    if chunk.text.is_empty() && chunk.finish_reason.is_none() && chunk.usage.is_none() {
        return Ok(None);
    }
    Ok(Some(chunk))
}

fn finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            FinishReason::ContentFilter
        }
        "FINISH_REASON_UNSPECIFIED" => FinishReason::Unknown,
        _ => FinishReason::Other,
    }
}

/// Pull a readable message out of an error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<GeminiErrorResponse>(body)
        .map(|r| r.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait]
impl LlmService for GeminiService {
    async fn stream(&self, request: &LlmRequest) -> Result<LlmStream, LlmError> {
        let gemini_request = Self::translate_request(request);

        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;
            return Err(LlmError::from_status(status.as_u16(), &error_message(&body)));
        }

        let events = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| async move {
                match event {
                    Ok(event) => parse_event(&event.data).transpose(),
                    Err(e) => Some(Err(LlmError::network(format!("Stream interrupted: {e}")))),
                }
            });
        Ok(Box::pin(events))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
    code: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Attachment, LlmMessage};
    use axum::response::IntoResponse;
    use axum::Router;
    use futures::TryStreamExt;
    use serde_json::json;

    #[test]
    fn test_translate_request_puts_attachments_first() {
        let request = LlmRequest {
            system: "be brief".to_string(),
            attachments: vec![Attachment {
                mime_type: "text/csv".to_string(),
                data: "YSxiCg==".to_string(),
            }],
            messages: vec![
                LlmMessage::assistant("Welcome"),
                LlmMessage::user("Am I eligible?"),
            ],
            max_tokens: None,
        };

        let value = serde_json::to_value(GeminiService::translate_request(&request)).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "inlineData": { "mimeType": "text/csv", "data": "YSxiCg==" } }] },
                    { "role": "model", "parts": [{ "text": "Welcome" }] },
                    { "role": "user", "parts": [{ "text": "Am I eligible?" }] }
                ],
                "systemInstruction": { "parts": [{ "text": "be brief" }] }
            })
        );
    }

    #[test]
    fn test_parse_event_text_and_finish() {
        let chunk = parse_event(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Good "},{"text":"day"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":12,"candidatesTokenCount":3}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(chunk.text, "Good day");
        assert_eq!(chunk.finish_reason, Some(FinishReason::Stop));
        assert_eq!(
            chunk.usage,
            Some(Usage {
                input_tokens: 12,
                output_tokens: 3
            })
        );
    }

    #[test]
    fn test_parse_event_edge_cases() {
        assert_eq!(parse_event("").unwrap(), None);
        assert_eq!(parse_event(r#"{"candidates":[]}"#).unwrap(), None);

        let blocked = parse_event(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap_err();
        assert_eq!(blocked.kind, crate::llm::LlmErrorKind::InvalidRequest);

        let err = parse_event(r#"{"error":{"code":429,"message":"quota"}}"#).unwrap_err();
        assert_eq!(err.kind, crate::llm::LlmErrorKind::RateLimit);

        let filtered = parse_event(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(filtered.finish_reason, Some(FinishReason::ContentFilter));
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_stream_reads_sse_events() {
        let router = Router::new().fallback(|| async {
                let body = concat!(
                    "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\r\n\r\n",
                    "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]},\"finishReason\":\"STOP\"}]}\r\n\r\n",
                );
                ([("content-type", "text/event-stream")], body).into_response()
            });
        let base = serve(router).await;

        let service = GeminiService::new("key", "test-model", Some(&base)).unwrap();
        let chunks: Vec<LlmChunk> = service
            .stream(&LlmRequest::default())
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let text: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(text, "Hello");
        assert_eq!(chunks.last().unwrap().finish_reason, Some(FinishReason::Stop));
    }

    #[tokio::test]
    async fn test_stream_maps_error_status() {
        let router = Router::new().fallback(|| async {
            (
                axum::http::StatusCode::UNAUTHORIZED,
                r#"{"error":{"code":401,"message":"bad key"}}"#,
            )
        });
        let base = serve(router).await;

        let service = GeminiService::new("key", "test-model", Some(&base)).unwrap();
        let Err(err) = service.stream(&LlmRequest::default()).await else {
            panic!("expected error status to fail");
        };
        assert_eq!(err.kind, crate::llm::LlmErrorKind::Auth);
        assert!(err.message.contains("bad key"));
    }
}
