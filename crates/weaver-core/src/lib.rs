//! weaver-core - Multi-provider report generation
//!
//! This crate provides:
//! - A provider abstraction over Claude, Gemini, and OpenAI chat APIs
//! - A generation router with a single primary-to-fallback substitution
//! - Streaming fragment delivery with a never-raises output contract
//! - The agent roles, prompts, and workflow behind the health report

pub mod agents;
pub mod config;
pub mod error;
pub mod prompts;
pub mod providers;
pub mod workflow;

// Re-export main types for convenience
pub use agents::AgentRole;
pub use config::RouterConfig;
pub use error::ProviderError;
pub use providers::{
    ClaudeProvider, FragmentStream, GeminiProvider, GeneratedStream, GenerationRequest,
    GenerationRouter, OpenAiProvider, ProviderKind, TextProvider,
};
pub use workflow::ReportWorkflow;
