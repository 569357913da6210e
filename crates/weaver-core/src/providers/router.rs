//! Generation router with one-shot primary-to-fallback substitution
//!
//! [`GenerationRouter::generate`] never raises: every provider failure is
//! either absorbed by the single fallback attempt or surfaced as a final
//! text fragment prefixed with `"Error:"`. Callers that only consume the
//! fragment stream never need an error path of their own.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::config::RouterConfig;
use crate::error::ProviderError;

use super::claude::ClaudeProvider;
use super::gemini::GeminiProvider;
use super::openai::OpenAiProvider;
use super::types::{FragmentStream, GenerationRequest, ProviderKind, TextProvider};

/// Longest failure detail carried into the terminal error fragment
const ERROR_DETAIL_LIMIT: usize = 200;

/// The fragment sequence returned by [`GenerationRouter::generate`]
pub type GeneratedStream<'a> = Pin<Box<dyn Stream<Item = String> + Send + 'a>>;

/// Routes generation requests to a primary provider with a single
/// fallback substitution on failure
pub struct GenerationRouter {
    providers: HashMap<ProviderKind, Arc<dyn TextProvider>>,
    primary: ProviderKind,
    fallback: ProviderKind,
}

impl std::fmt::Debug for GenerationRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut configured: Vec<&str> = self.providers.keys().map(|k| k.as_str()).collect();
        configured.sort_unstable();
        f.debug_struct("GenerationRouter")
            .field("primary", &self.primary)
            .field("fallback", &self.fallback)
            .field("configured", &configured)
            .finish()
    }
}

impl GenerationRouter {
    /// Create an empty router; backends are registered with
    /// [`with_provider`](Self::with_provider)
    pub fn new(primary: ProviderKind, fallback: ProviderKind) -> Self {
        Self {
            providers: HashMap::new(),
            primary,
            fallback,
        }
    }

    /// Register a backend under a provider kind
    pub fn with_provider(mut self, kind: ProviderKind, provider: Arc<dyn TextProvider>) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    /// Build a router from configuration, constructing a backend for each
    /// provider with a credential present
    pub fn from_config(config: &RouterConfig) -> Self {
        let mut router = Self::new(config.primary, config.fallback);

        if let Some(key) = &config.anthropic_api_key {
            router = router.with_provider(
                ProviderKind::Claude,
                Arc::new(ClaudeProvider::new(
                    key.clone(),
                    config.claude_model.clone(),
                    config.timeout(),
                )),
            );
        }
        if let Some(key) = &config.gemini_api_key {
            router = router.with_provider(
                ProviderKind::Gemini,
                Arc::new(GeminiProvider::new(
                    key.clone(),
                    config.gemini_model.clone(),
                    config.timeout(),
                )),
            );
        }
        if let Some(key) = &config.openai_api_key {
            router = router.with_provider(
                ProviderKind::OpenAi,
                Arc::new(OpenAiProvider::new(
                    key.clone(),
                    config.openai_model.clone(),
                    config.timeout(),
                )),
            );
        }

        info!(
            "Generation router ready: primary={}, fallback={}, configured={:?}",
            router.primary,
            router.fallback,
            router.providers.keys().map(|k| k.as_str()).collect::<Vec<_>>(),
        );
        router
    }

    /// The provider tried first for every request
    pub fn primary(&self) -> ProviderKind {
        self.primary
    }

    /// The provider substituted after a primary failure
    pub fn fallback(&self) -> ProviderKind {
        self.fallback
    }

    /// Number of registered backends
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Produce the lazy fragment sequence for one request.
    ///
    /// The sequence is finite, single-pass, and strictly ordered;
    /// non-streaming requests yield exactly one fragment. Failures never
    /// escape the stream: the primary failure triggers one fallback
    /// attempt, and total failure yields a single fragment beginning
    /// `"Error:"`.
    pub fn generate(&self, request: GenerationRequest) -> GeneratedStream<'_> {
        Box::pin(stream! {
            debug!(
                "Routing request: primary={}, streaming={}, prompt_len={}",
                self.primary,
                request.streaming,
                request.prompt.len()
            );

            let primary_err = {
                let mut failure = None;
                match self.attempt(self.primary, &request).await {
                    Ok(mut fragments) => {
                        while let Some(item) = fragments.next().await {
                            match item {
                                Ok(text) => yield text,
                                Err(e) => {
                                    failure = Some(e);
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => failure = Some(e),
                }
                match failure {
                    Some(e) => e,
                    None => return,
                }
            };

            warn!(
                "Primary provider {} failed: {}",
                self.primary, primary_err
            );

            let Some(fallback) = self.fallback_for() else {
                warn!("No distinct fallback provider available");
                yield error_fragment(&primary_err);
                return;
            };

            info!("Falling back from {} to {}", self.primary, fallback);

            let mut fallback_err = None;
            match self.attempt(fallback, &request).await {
                Ok(mut fragments) => {
                    while let Some(item) = fragments.next().await {
                        match item {
                            Ok(text) => yield text,
                            Err(e) => {
                                fallback_err = Some(e);
                                break;
                            }
                        }
                    }
                }
                Err(e) => fallback_err = Some(e),
            }

            if let Some(e) = fallback_err {
                error!("Fallback provider {} also failed: {}", fallback, e);
                yield error_fragment(&primary_err);
            }
        })
    }

    /// Run one attempt against one provider; non-streaming requests are
    /// adapted into a single-fragment stream
    async fn attempt(
        &self,
        kind: ProviderKind,
        request: &GenerationRequest,
    ) -> Result<FragmentStream, ProviderError> {
        let provider = self.resolve(kind)?;
        debug!(
            "Invoking provider {} (model {})",
            provider.name(),
            provider.model()
        );

        if request.streaming {
            provider.stream(request).await
        } else {
            let text = provider.complete(request).await?;
            Ok(Box::pin(futures::stream::once(async move { Ok(text) })) as FragmentStream)
        }
    }

    fn resolve(&self, kind: ProviderKind) -> Result<Arc<dyn TextProvider>, ProviderError> {
        if let Some(provider) = self.providers.get(&kind) {
            return Ok(Arc::clone(provider));
        }
        match kind {
            ProviderKind::Bedrock => Err(ProviderError::Unsupported(kind.to_string())),
            _ => Err(ProviderError::Unavailable(kind.to_string())),
        }
    }

    /// Select the provider for the fallback attempt.
    ///
    /// The configured fallback is used when distinct from the primary.
    /// When it is not, any other registered provider substitutes (in a
    /// fixed preference order); with none available the attempt is
    /// skipped and the caller emits the both-failed fragment.
    fn fallback_for(&self) -> Option<ProviderKind> {
        if self.fallback != self.primary {
            return Some(self.fallback);
        }
        [
            ProviderKind::Claude,
            ProviderKind::Gemini,
            ProviderKind::OpenAi,
            ProviderKind::Bedrock,
        ]
        .into_iter()
        .find(|k| *k != self.primary && self.providers.contains_key(k))
    }
}

/// Terminal fragment for total failure; carries the primary failure detail
fn error_fragment(primary_err: &ProviderError) -> String {
    let detail: String = primary_err
        .to_string()
        .chars()
        .take(ERROR_DETAIL_LIMIT)
        .collect();
    format!(
        "Error: Both primary and fallback providers failed. {}",
        detail
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    /// Scriptable provider for router tests
    struct StubProvider {
        name: String,
        fragments: Vec<String>,
        /// Fail before producing anything
        fail: Option<String>,
        /// Fail after yielding this many fragments
        fail_after: Option<usize>,
        calls: AtomicUsize,
        last_request: Mutex<Option<GenerationRequest>>,
    }

    impl StubProvider {
        fn ok(name: &str, fragments: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                fragments: fragments.iter().map(|s| s.to_string()).collect(),
                fail: None,
                fail_after: None,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn failing(name: &str, error: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                fragments: vec![],
                fail: Some(error.to_string()),
                fail_after: None,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn failing_mid_stream(name: &str, fragments: &[&str], after: usize) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                fragments: fragments.iter().map(|s| s.to_string()).collect(),
                fail: None,
                fail_after: Some(after),
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn record(&self, request: &GenerationRequest) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
        }
    }

    #[async_trait]
    impl TextProvider for StubProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        async fn complete(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
            self.record(request);
            if let Some(err) = &self.fail {
                return Err(ProviderError::call_failed(&self.name, err.clone()));
            }
            Ok(self.fragments.concat())
        }

        async fn stream(&self, request: &GenerationRequest) -> Result<FragmentStream, ProviderError> {
            self.record(request);
            if let Some(err) = &self.fail {
                return Err(ProviderError::call_failed(&self.name, err.clone()));
            }
            let mut items: Vec<Result<String, ProviderError>> = match self.fail_after {
                Some(n) => self.fragments.iter().take(n).cloned().map(Ok).collect(),
                None => self.fragments.iter().cloned().map(Ok).collect(),
            };
            if self.fail_after.is_some() {
                items.push(Err(ProviderError::call_failed(
                    &self.name,
                    "connection reset mid-stream",
                )));
            }
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    fn terse_request() -> GenerationRequest {
        GenerationRequest::new("Summarize X")
            .with_system("You are terse.")
            .with_temperature(0.3)
            .with_streaming(true)
    }

    async fn collect(router: &GenerationRouter, request: GenerationRequest) -> Vec<String> {
        router.generate(request).collect().await
    }

    #[tokio::test]
    async fn test_primary_success_never_invokes_fallback() {
        let primary = StubProvider::ok("claude", &["Result: ", "X is concise."]);
        let fallback = StubProvider::ok("gemini", &["unused"]);
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Gemini)
            .with_provider(ProviderKind::Claude, primary.clone())
            .with_provider(ProviderKind::Gemini, fallback.clone());

        let fragments = collect(&router, terse_request()).await;
        assert_eq!(fragments, vec!["Result: ", "X is concise."]);
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_receives_identical_request() {
        let primary = StubProvider::failing("claude", "status 500: boom");
        let fallback = StubProvider::ok("gemini", &["ok"]);
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Gemini)
            .with_provider(ProviderKind::Claude, primary)
            .with_provider(ProviderKind::Gemini, fallback.clone());

        let request = terse_request().with_max_tokens(777);
        let _ = collect(&router, request.clone()).await;

        let seen = fallback.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(seen.prompt, request.prompt);
        assert_eq!(seen.system, request.system);
        assert_eq!(seen.temperature, request.temperature);
        assert_eq!(seen.max_tokens, 777);
        assert_eq!(seen.streaming, request.streaming);
    }

    #[tokio::test]
    async fn test_fallback_output_replaces_primary_failure() {
        // Concrete scenario from the router contract: primary raises,
        // fallback streams two fragments, no error fragment appears.
        let primary = StubProvider::failing("claude", "ProviderCallFailed");
        let fallback = StubProvider::ok("gemini", &["Result: ", "X is concise."]);
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Gemini)
            .with_provider(ProviderKind::Claude, primary)
            .with_provider(ProviderKind::Gemini, fallback);

        let fragments = collect(&router, terse_request()).await;
        assert_eq!(fragments, vec!["Result: ", "X is concise."]);
    }

    #[tokio::test]
    async fn test_both_fail_yields_single_error_fragment() {
        let primary = StubProvider::failing("claude", "status 401: unauthorized");
        let fallback = StubProvider::failing("gemini", "status 503: overloaded");
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Gemini)
            .with_provider(ProviderKind::Claude, primary)
            .with_provider(ProviderKind::Gemini, fallback);

        let fragments = collect(&router, terse_request()).await;
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].starts_with("Error: Both primary and fallback providers failed."));
        // Detail carries the primary failure, not the fallback's
        assert!(fragments[0].contains("401"));
        assert!(!fragments[0].contains("503"));
    }

    #[tokio::test]
    async fn test_error_detail_is_truncated() {
        let long_detail = "x".repeat(1000);
        let primary = StubProvider::failing("claude", &long_detail);
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Claude)
            .with_provider(ProviderKind::Claude, primary);

        let fragments = collect(&router, terse_request()).await;
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].len() < 300);
    }

    #[tokio::test]
    async fn test_non_streaming_yields_exactly_one_fragment() {
        let primary = StubProvider::ok("claude", &["Hello, ", "world"]);
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Gemini)
            .with_provider(ProviderKind::Claude, primary);

        let request = GenerationRequest::new("hi").with_streaming(false);
        let fragments = collect(&router, request).await;
        assert_eq!(fragments, vec!["Hello, world"]);
    }

    #[tokio::test]
    async fn test_streaming_and_non_streaming_concatenate_equally() {
        let provider = StubProvider::ok("claude", &["a", "b", "c"]);
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Gemini)
            .with_provider(ProviderKind::Claude, provider);

        let streamed = collect(&router, GenerationRequest::new("p").with_streaming(true)).await;
        let whole = collect(&router, GenerationRequest::new("p").with_streaming(false)).await;
        assert_eq!(streamed.concat(), whole.concat());
        assert_eq!(whole.len(), 1);
    }

    #[tokio::test]
    async fn test_generate_is_idempotent_against_deterministic_backend() {
        let provider = StubProvider::ok("claude", &["same ", "output"]);
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Gemini)
            .with_provider(ProviderKind::Claude, provider);

        let first = collect(&router, terse_request()).await.concat();
        let second = collect(&router, terse_request()).await.concat();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unconfigured_primary_behaves_like_call_failure() {
        // No claude backend registered: resolution fails lazily inside
        // the stream and triggers fallback, never a panic or early error.
        let fallback = StubProvider::ok("gemini", &["recovered"]);
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Gemini)
            .with_provider(ProviderKind::Gemini, fallback.clone());

        let fragments = collect(&router, terse_request()).await;
        assert_eq!(fragments, vec!["recovered"]);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_primary_triggers_fallback() {
        let fallback = StubProvider::ok("gemini", &["ok"]);
        let router = GenerationRouter::new(ProviderKind::Bedrock, ProviderKind::Gemini)
            .with_provider(ProviderKind::Gemini, fallback);

        let fragments = collect(&router, terse_request()).await;
        assert_eq!(fragments, vec!["ok"]);
    }

    #[tokio::test]
    async fn test_unsupported_everywhere_names_the_provider() {
        let router = GenerationRouter::new(ProviderKind::Bedrock, ProviderKind::Bedrock);

        let fragments = collect(&router, terse_request()).await;
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].starts_with("Error:"));
        assert!(fragments[0].contains("bedrock"));
        assert!(fragments[0].contains("no implemented backend"));
    }

    #[tokio::test]
    async fn test_duplicate_fallback_substitutes_distinct_provider() {
        let primary = StubProvider::failing("claude", "down");
        let other = StubProvider::ok("openai", &["from openai"]);
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Claude)
            .with_provider(ProviderKind::Claude, primary)
            .with_provider(ProviderKind::OpenAi, other.clone());

        let fragments = collect(&router, terse_request()).await;
        assert_eq!(fragments, vec!["from openai"]);
        assert_eq!(other.calls(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_fallback_with_no_alternative_fails_terminally() {
        let primary = StubProvider::failing("claude", "down");
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Claude)
            .with_provider(ProviderKind::Claude, primary.clone());

        let fragments = collect(&router, terse_request()).await;
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].starts_with("Error: Both primary and fallback providers failed."));
        // The duplicate attempt is skipped, not repeated
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_triggers_full_fallback_attempt() {
        // Fragments already emitted by the primary stay emitted; the
        // fallback then re-runs the whole request.
        let primary = StubProvider::failing_mid_stream("claude", &["partial "], 1);
        let fallback = StubProvider::ok("gemini", &["complete ", "answer"]);
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Gemini)
            .with_provider(ProviderKind::Claude, primary)
            .with_provider(ProviderKind::Gemini, fallback.clone());

        let fragments = collect(&router, terse_request()).await;
        assert_eq!(fragments, vec!["partial ", "complete ", "answer"]);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_do_not_interfere() {
        let provider = StubProvider::ok("claude", &["one ", "two ", "three"]);
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Gemini)
            .with_provider(ProviderKind::Claude, provider);

        let (a, b) = tokio::join!(
            collect(&router, GenerationRequest::new("first").with_streaming(true)),
            collect(&router, GenerationRequest::new("second").with_streaming(true)),
        );
        assert_eq!(a.concat(), "one two three");
        assert_eq!(b.concat(), "one two three");
    }

    #[test]
    fn test_from_config_registers_only_credentialed_backends() {
        let config = RouterConfig {
            anthropic_api_key: Some("sk-ant-test".to_string()),
            gemini_api_key: None,
            openai_api_key: Some("sk-test".to_string()),
            ..RouterConfig::default()
        };
        let router = GenerationRouter::from_config(&config);
        assert_eq!(router.provider_count(), 2);
        assert_eq!(router.primary(), ProviderKind::Claude);
        assert_eq!(router.fallback(), ProviderKind::Gemini);
    }

    #[test]
    fn test_debug_lists_configured_kinds() {
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Gemini)
            .with_provider(ProviderKind::Gemini, StubProvider::ok("gemini", &[]));
        let debug = format!("{:?}", router);
        assert!(debug.contains("gemini"));
    }
}
