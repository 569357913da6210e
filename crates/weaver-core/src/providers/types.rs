//! Provider-agnostic types for multi-provider text generation

use std::pin::Pin;
use std::str::FromStr;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A single generation request, created per call and immutable once built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The user prompt
    pub prompt: String,
    /// System instruction, may be empty
    pub system: String,
    /// Sampling temperature in [0, 1]
    pub temperature: f32,
    /// Positive output token budget
    pub max_tokens: u32,
    /// Incremental fragment delivery vs. one complete response
    pub streaming: bool,
}

impl GenerationRequest {
    /// Create a request with default sampling parameters
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: String::new(),
            temperature: 0.7,
            max_tokens: 4096,
            streaming: false,
        }
    }

    /// Set the system instruction
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the output token budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Enable or disable streaming delivery
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}

/// A boxed stream of text fragments as a backend produces them.
///
/// Fragments are non-empty and concatenate in emission order to the full
/// response. An `Err` item terminates the attempt.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Trait that all text-generation backends implement
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Provider name (e.g. "claude", "gemini")
    fn name(&self) -> &str;

    /// Model identifier (e.g. "claude-sonnet-4-20250514")
    fn model(&self) -> &str;

    /// Wait for the complete response and return it as one string
    async fn complete(&self, request: &GenerationRequest) -> Result<String, ProviderError>;

    /// Return fragments incrementally as the remote service produces them
    async fn stream(&self, request: &GenerationRequest) -> Result<FragmentStream, ProviderError>;
}

/// The closed set of provider kinds the router can dispatch to.
///
/// Bedrock is enumerated for configuration compatibility but has no
/// implemented backend; selecting it produces
/// [`ProviderError::Unsupported`] and triggers fallback like any other
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Claude,
    Gemini,
    OpenAi,
    Bedrock,
}

impl ProviderKind {
    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Bedrock => "bedrock",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(Self::Claude),
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" | "gpt" => Ok(Self::OpenAi),
            "aws" | "bedrock" => Ok(Self::Bedrock),
            other => Err(format!("unknown provider name: {}", other)),
        }
    }
}
