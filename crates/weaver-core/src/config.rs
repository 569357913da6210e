//! Environment-sourced router configuration
//!
//! Loaded once at process start and read-only afterwards. Parsing goes
//! through an injectable lookup so tests can supply values without
//! touching the process environment.

use std::time::Duration;

use tracing::warn;

use crate::providers::types::{GenerationRequest, ProviderKind};

/// Router and provider configuration
#[derive(Clone)]
pub struct RouterConfig {
    /// Provider tried first for every request
    pub primary: ProviderKind,
    /// Provider substituted once after a primary failure
    pub fallback: ProviderKind,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub claude_model: String,
    pub gemini_model: String,
    pub openai_model: String,
    /// Default sampling temperature for requests built from this config
    pub temperature: f32,
    /// Default output token budget
    pub max_tokens: u32,
    /// Default streaming toggle
    pub streaming: bool,
    /// Per-call HTTP timeout in seconds
    pub timeout_secs: u64,
    /// Retry budget; the transport may use it, the router itself performs
    /// only the single primary-to-fallback substitution
    pub retry_attempts: u32,
}

impl std::fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterConfig")
            .field("primary", &self.primary)
            .field("fallback", &self.fallback)
            .field("anthropic_api_key", &mask_option(&self.anthropic_api_key))
            .field("gemini_api_key", &mask_option(&self.gemini_api_key))
            .field("openai_api_key", &mask_option(&self.openai_api_key))
            .field("claude_model", &self.claude_model)
            .field("gemini_model", &self.gemini_model)
            .field("openai_model", &self.openai_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("streaming", &self.streaming)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry_attempts", &self.retry_attempts)
            .finish()
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            primary: ProviderKind::Claude,
            fallback: ProviderKind::Gemini,
            anthropic_api_key: None,
            gemini_api_key: None,
            openai_api_key: None,
            claude_model: "claude-sonnet-4-20250514".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            openai_model: "gpt-4o".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            streaming: true,
            timeout_secs: 120,
            retry_attempts: 2,
        }
    }
}

impl RouterConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            primary: parse_provider(&lookup, "PRIMARY_PROVIDER", defaults.primary),
            fallback: parse_provider(&lookup, "FALLBACK_PROVIDER", defaults.fallback),
            anthropic_api_key: non_empty(lookup("ANTHROPIC_API_KEY")),
            gemini_api_key: non_empty(lookup("GEMINI_API_KEY")),
            openai_api_key: non_empty(lookup("OPENAI_API_KEY")),
            claude_model: non_empty(lookup("CLAUDE_MODEL")).unwrap_or(defaults.claude_model),
            gemini_model: non_empty(lookup("GEMINI_MODEL")).unwrap_or(defaults.gemini_model),
            openai_model: non_empty(lookup("OPENAI_MODEL")).unwrap_or(defaults.openai_model),
            temperature: parse_temperature(&lookup, "LLM_TEMPERATURE", defaults.temperature),
            max_tokens: parse_number(&lookup, "LLM_MAX_TOKENS", defaults.max_tokens),
            streaming: parse_bool(&lookup, "LLM_STREAMING", defaults.streaming),
            timeout_secs: parse_number(&lookup, "LLM_TIMEOUT_SECS", defaults.timeout_secs),
            retry_attempts: parse_number(&lookup, "LLM_RETRY_ATTEMPTS", defaults.retry_attempts),
        }
    }

    /// Per-call HTTP timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build a request carrying this configuration's sampling defaults
    pub fn base_request(&self, prompt: impl Into<String>) -> GenerationRequest {
        GenerationRequest::new(prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_streaming(self.streaming)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_provider<F>(lookup: &F, key: &str, default: ProviderKind) -> ProviderKind
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup(key)) {
        Some(raw) => raw.parse().unwrap_or_else(|e: String| {
            warn!("Invalid {}: {} (using {})", key, e, default);
            default
        }),
        None => default,
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match non_empty(lookup(key)) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid {}: {:?} (using {})", key, raw, default);
            default
        }),
        None => default,
    }
}

fn parse_temperature<F>(lookup: &F, key: &str, default: f32) -> f32
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_number(lookup, key, default);
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        warn!("Invalid {}: {} not in [0, 1] (using {})", key, value, default);
        default
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup(key)) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => {
                warn!("Invalid {}: {:?} (using {})", key, raw, default);
                default
            }
        },
        None => default,
    }
}

fn mask_option(value: &Option<String>) -> String {
    match value {
        Some(v) => mask_secret(v),
        None => "(unset)".to_string(),
    }
}

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}
