//! Anthropic Claude backend (Messages API)

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;

use super::sse::SseLineBuffer;
use super::types::{FragmentStream, GenerationRequest, TextProvider};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const PROVIDER_NAME: &str = "claude";

/// Anthropic Claude backend
pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for ClaudeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeProvider")
            .field("model", &self.model)
            .finish()
    }
}

impl ClaudeProvider {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            model,
        }
    }

    fn build_request(&self, request: &GenerationRequest, stream: bool) -> ClaudeRequest {
        ClaudeRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: if request.system.is_empty() {
                None
            } else {
                Some(request.system.clone())
            },
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            stream,
        }
    }

    async fn send(
        &self,
        request: &GenerationRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let body = self.build_request(request, stream);

        debug!(
            "Claude request: model={}, streaming={}, prompt_len={}",
            self.model,
            stream,
            request.prompt.len()
        );

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::call_failed(PROVIDER_NAME, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::call_failed(
                PROVIDER_NAME,
                format!("status {}: {}", status, detail),
            ));
        }

        Ok(response)
    }
}

#[async_trait]
impl TextProvider for ClaudeProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let response = self.send(request, false).await?;

        let api_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::call_failed(PROVIDER_NAME, format!("parse error: {}", e)))?;

        extract_text(api_response)
    }

    async fn stream(&self, request: &GenerationRequest) -> Result<FragmentStream, ProviderError> {
        let response = self.send(request, true).await?;
        let mut bytes = response.bytes_stream();

        let fragments = stream! {
            let mut lines = SseLineBuffer::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(ProviderError::call_failed(
                            PROVIDER_NAME,
                            format!("stream read failed: {}", e),
                        ));
                        return;
                    }
                };
                for data in lines.push(&chunk) {
                    match parse_stream_data(&data) {
                        Ok(Some(text)) => yield Ok(text),
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(fragments))
    }
}

/// Extract the concatenated text blocks from a complete response
fn extract_text(response: ClaudeResponse) -> Result<String, ProviderError> {
    let text: String = response
        .content
        .iter()
        .filter_map(|b| b.text.as_deref())
        .collect();

    if text.is_empty() {
        return Err(ProviderError::call_failed(
            PROVIDER_NAME,
            "response contained no text blocks",
        ));
    }
    Ok(text)
}

/// Parse one SSE `data:` payload; `Ok(None)` for non-text events
fn parse_stream_data(data: &str) -> Result<Option<String>, ProviderError> {
    let event: ClaudeStreamEvent = serde_json::from_str(data)
        .map_err(|e| ProviderError::call_failed(PROVIDER_NAME, format!("parse error: {}", e)))?;

    match event.kind.as_str() {
        "content_block_delta" => Ok(event
            .delta
            .and_then(|d| d.text)
            .filter(|t| !t.is_empty())),
        "error" => {
            let message = event
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "unknown stream error".to_string());
            Err(ProviderError::call_failed(PROVIDER_NAME, message))
        }
        _ => Ok(None),
    }
}

// ── Claude wire types ──

#[derive(Debug, Clone, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeBlock>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClaudeBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClaudeStreamEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<ClaudeDelta>,
    #[serde(default)]
    error: Option<ClaudeApiError>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClaudeDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClaudeApiError {
    message: String,
}
