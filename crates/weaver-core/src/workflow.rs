//! Report workflow orchestration
//!
//! Runs the generation steps in pipeline order (framework, analysis, a
//! parallel design/insights pair, policy, final report) and persists each
//! step's concatenated output as one markdown artifact.
//! Generation failures never abort the workflow: the router surfaces them
//! as `"Error:"` fragments which land in the artifact; only file I/O
//! errors propagate.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::StreamExt;
use tracing::{info, warn};

use crate::agents::AgentRole;
use crate::prompts;
use crate::providers::{GenerationRequest, GenerationRouter};

/// How much of a prior artifact is carried into the next step's prompt
const EXCERPT_LIMIT: usize = 2000;

/// Orchestrates the report pipeline against one router
pub struct ReportWorkflow {
    router: GenerationRouter,
    output_dir: PathBuf,
    max_tokens: u32,
    streaming: bool,
    echo: bool,
}

impl ReportWorkflow {
    pub fn new(router: GenerationRouter, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            router,
            output_dir: output_dir.into(),
            max_tokens: 4096,
            streaming: true,
            echo: true,
        }
    }

    /// Set the per-step output token budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Toggle streaming delivery for every step
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Toggle echoing fragments to stdout for the sequential steps
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Run the full pipeline, writing one artifact per step
    pub async fn run(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| {
                format!("Failed to create output dir: {}", self.output_dir.display())
            })?;

        let started = Utc::now();
        info!(
            "Starting report workflow (output: {})",
            self.output_dir.display()
        );

        let initialization = self
            .run_step(
                AgentRole::DataAnalyst,
                prompts::initialization_prompt(),
                "01_initialization.md",
                true,
            )
            .await?;

        let analysis = self
            .run_step(
                AgentRole::DataAnalyst,
                prompts::analysis_prompt(excerpt(&initialization)),
                "03_analysis.md",
                true,
            )
            .await?;

        // The two middle sections are independent; run them concurrently.
        // Echo stays off here so their fragments cannot interleave on the
        // terminal.
        info!("Running visualization design and health insights in parallel");
        let (visualization, health) = tokio::join!(
            self.run_step(
                AgentRole::VisualizationExpert,
                prompts::visualization_prompt(excerpt(&analysis)),
                "04_visualization_design.md",
                false,
            ),
            self.run_step(
                AgentRole::HealthResearcher,
                prompts::health_insights_prompt(excerpt(&analysis)),
                "05_health_insights.md",
                false,
            ),
        );
        visualization?;
        let health = health?;

        let policy = self
            .run_step(
                AgentRole::PolicyAdvisor,
                prompts::policy_prompt(excerpt(&health)),
                "06_policy_recommendations.md",
                true,
            )
            .await?;

        self.run_step(
            AgentRole::HealthResearcher,
            prompts::report_prompt(excerpt(&analysis), excerpt(&health), excerpt(&policy)),
            "FINAL_REPORT.md",
            true,
        )
        .await?;

        self.log_summary(started).await
    }

    /// Execute one generation step and persist its artifact.
    ///
    /// Returns the full concatenated text so later steps can excerpt it.
    async fn run_step(
        &self,
        role: AgentRole,
        prompt: String,
        artifact: &str,
        echo: bool,
    ) -> Result<String> {
        info!("Generating {} ({} agent)", artifact, role);

        let request = GenerationRequest::new(prompt)
            .with_system(role.system_prompt())
            .with_temperature(role.temperature())
            .with_max_tokens(self.max_tokens)
            .with_streaming(self.streaming);

        let mut fragments = self.router.generate(request);
        let mut text = String::new();
        while let Some(fragment) = fragments.next().await {
            if echo && self.echo {
                print!("{}", fragment);
                let _ = std::io::stdout().flush();
            }
            text.push_str(&fragment);
        }
        drop(fragments);

        let path = self.output_dir.join(artifact);
        tokio::fs::write(&path, &text)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        if text.starts_with("Error:") {
            warn!(
                "Generation for {} failed; artifact holds the error notice",
                artifact
            );
        } else {
            info!("Saved {} ({} bytes)", path.display(), text.len());
        }
        Ok(text)
    }

    async fn log_summary(&self, started: chrono::DateTime<Utc>) -> Result<()> {
        let elapsed = Utc::now() - started;
        info!(
            "Report workflow complete in {}s, artifacts in {}:",
            elapsed.num_seconds(),
            self.output_dir.display()
        );

        let mut entries = tokio::fs::read_dir(&self.output_dir)
            .await
            .with_context(|| format!("Failed to list {}", self.output_dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "md") {
                let size = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
                info!("  {} ({} bytes)", path.display(), size);
            }
        }
        Ok(())
    }
}

/// First part of a prior artifact, bounded for prompt budgets
fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(EXCERPT_LIMIT) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::ProviderError;
    use crate::providers::{FragmentStream, ProviderKind, TextProvider};

    const ARTIFACTS: [&str; 6] = [
        "01_initialization.md",
        "03_analysis.md",
        "04_visualization_design.md",
        "05_health_insights.md",
        "06_policy_recommendations.md",
        "FINAL_REPORT.md",
    ];

    /// Deterministic provider echoing a fixed section body
    struct SectionProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextProvider for SectionProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        async fn complete(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("# Section\n\nGenerated body.".to_string())
        }

        async fn stream(
            &self,
            _request: &GenerationRequest,
        ) -> Result<FragmentStream, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let items = vec![
                Ok("# Section\n\n".to_string()),
                Ok("Generated body.".to_string()),
            ];
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    fn stub_workflow(dir: &std::path::Path) -> (ReportWorkflow, Arc<SectionProvider>) {
        let provider = Arc::new(SectionProvider {
            calls: AtomicUsize::new(0),
        });
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Gemini)
            .with_provider(ProviderKind::Claude, provider.clone());
        let workflow = ReportWorkflow::new(router, dir).with_echo(false);
        (workflow, provider)
    }

    #[tokio::test]
    async fn test_run_writes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let (workflow, provider) = stub_workflow(dir.path());

        workflow.run().await.unwrap();

        for artifact in ARTIFACTS {
            let content = std::fs::read_to_string(dir.path().join(artifact)).unwrap();
            assert_eq!(content, "# Section\n\nGenerated body.", "{}", artifact);
        }
        // One generation per artifact
        assert_eq!(provider.calls.load(Ordering::SeqCst), ARTIFACTS.len());
    }

    #[tokio::test]
    async fn test_run_survives_total_generation_failure() {
        let dir = tempfile::tempdir().unwrap();
        // No providers registered at all: every step degrades to the
        // router's error fragment, but the workflow still completes.
        let router = GenerationRouter::new(ProviderKind::Claude, ProviderKind::Gemini);
        let workflow = ReportWorkflow::new(router, dir.path()).with_echo(false);

        workflow.run().await.unwrap();

        for artifact in ARTIFACTS {
            let content = std::fs::read_to_string(dir.path().join(artifact)).unwrap();
            assert!(content.starts_with("Error:"), "{}", artifact);
        }
    }

    #[tokio::test]
    async fn test_non_streaming_workflow_writes_same_content() {
        let dir = tempfile::tempdir().unwrap();
        let (workflow, _) = stub_workflow(dir.path());
        let workflow = workflow.with_streaming(false);

        workflow.run().await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("FINAL_REPORT.md")).unwrap();
        assert_eq!(content, "# Section\n\nGenerated body.");
    }

    #[test]
    fn test_excerpt_bounds_long_text() {
        let long = "x".repeat(EXCERPT_LIMIT * 2);
        assert_eq!(excerpt(&long).len(), EXCERPT_LIMIT);
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let long = "é".repeat(EXCERPT_LIMIT + 10);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), EXCERPT_LIMIT);
    }
}
