//! Language-model clients.
//!
//! Blocking reqwest clients (no Tokio runtime required) for Gemini and
//! OpenAI, plus the adapters that plug them into the insight pipeline as
//! translator and synthesizer.

pub mod adapters;
pub mod backend;
pub mod error;
pub mod gemini;
pub mod openai;
pub mod sql;

pub use adapters::{LlmSynthesizer, LlmTranslator};
pub use backend::{build_backend, CompletionBackend, SharedBackend};
pub use error::LlmError;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use sql::clean_sql;
