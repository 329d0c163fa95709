// Configuration loading

pub mod ai;
pub mod settings;

pub use ai::{get_api_key, KeyLookup, KeySource, LlmConfigStatus, LlmDiagnostics, ResolvedLlmConfig};
pub use settings::{ConfigError, DatabaseSettings, LlmProvider, LlmSettings, Settings, SynthesisSettings};
