//! Google Gemini backend (generateContent / streamGenerateContent)

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderError;

use super::sse::SseLineBuffer;
use super::types::{FragmentStream, GenerationRequest, TextProvider};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const PROVIDER_NAME: &str = "gemini";

/// Google Gemini backend
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiProvider {
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

    fn build_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": request.prompt}],
            }],
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens,
            },
        });

        if !request.system.is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{"text": request.system}]
            });
        }
        body
    }

    async fn send(
        &self,
        request: &GenerationRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = if stream {
            format!(
                "{}/{}:streamGenerateContent?alt=sse&key={}",
                API_BASE, self.model, self.api_key
            )
        } else {
            format!("{}/{}:generateContent?key={}", API_BASE, self.model, self.api_key)
        };

        debug!(
            "Gemini request: model={}, streaming={}, prompt_len={}",
            self.model,
            stream,
            request.prompt.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&self.build_body(request))
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
impl TextProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let response = self.send(request, false).await?;

        let api_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::call_failed(PROVIDER_NAME, format!("parse error: {}", e)))?;

        let text = extract_text(&api_response);
        if text.is_empty() {
            return Err(ProviderError::call_failed(
                PROVIDER_NAME,
                "response contained no candidates with text",
            ));
        }
        Ok(text)
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

/// Concatenate the text parts of the first candidate
fn extract_text(response: &GeminiResponse) -> String {
    response
        .candidates
        .first()
        .map(|c| {
            c.content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect()
        })
        .unwrap_or_default()
}

/// Parse one SSE `data:` payload; each payload is a full response chunk
fn parse_stream_data(data: &str) -> Result<Option<String>, ProviderError> {
    let chunk: GeminiResponse = serde_json::from_str(data)
        .map_err(|e| ProviderError::call_failed(PROVIDER_NAME, format!("parse error: {}", e)))?;

    let text = extract_text(&chunk);
    Ok(if text.is_empty() { None } else { Some(text) })
}

// ── Gemini wire types ──

#[derive(Debug, Clone, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}
