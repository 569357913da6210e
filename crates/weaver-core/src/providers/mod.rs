//! Multi-provider text generation
//!
//! Backends implement the [`TextProvider`] trait (one `complete` and one
//! `stream` operation each) and are composed by [`GenerationRouter`],
//! which adds the single primary-to-fallback substitution and the
//! never-raises output contract.

pub mod claude;
pub mod gemini;
pub mod openai;
pub mod router;
pub mod sse;
pub mod types;

pub use claude::ClaudeProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use router::{GeneratedStream, GenerationRouter};
pub use types::{FragmentStream, GenerationRequest, ProviderKind, TextProvider};
