use std::fmt;

use peoplesay_engine::{SynthesisError, TranslationError};

/// Error type for provider calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// No API key for the configured provider
    MissingKey(String),
    /// Provider is `none`
    Disabled,
    /// Connection failure
    Network(String),
    /// Request exceeded the configured timeout
    Timeout(u64),
    /// Non-success HTTP status with the provider's message
    Api { status: u16, message: String },
    /// Response body did not have the expected shape
    Parse(String),
    /// Response had no text (empty candidates, safety block)
    Empty(String),
}

impl LlmError {
    /// True when the provider refused the credential.
    pub fn is_auth(&self) -> bool {
        match self {
            LlmError::Api { status: 401 | 403, .. } => true,
            // Gemini answers a bad key with 400 INVALID_ARGUMENT
            LlmError::Api { status: 400, message } => message.contains("API key"),
            _ => false,
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::MissingKey(msg) => write!(f, "{}", msg),
            LlmError::Disabled => write!(f, "AI provider is set to none"),
            LlmError::Network(msg) => write!(f, "network error: {}", msg),
            LlmError::Timeout(secs) => write!(f, "request timed out after {}s", secs),
            LlmError::Api { status, message } => write!(f, "HTTP {}: {}", status, message),
            LlmError::Parse(msg) => write!(f, "unexpected response: {}", msg),
            LlmError::Empty(reason) => write!(f, "empty response ({})", reason),
        }
    }
}

impl std::error::Error for LlmError {}

impl From<LlmError> for TranslationError {
    fn from(e: LlmError) -> Self {
        if e.is_auth() {
            return TranslationError::InvalidCredential(e.to_string());
        }
        match e {
            LlmError::MissingKey(msg) => TranslationError::MissingCredential(msg),
            LlmError::Disabled => TranslationError::MissingCredential("AI provider is set to none".into()),
            LlmError::Empty(_) => TranslationError::EmptyOutput,
            other => TranslationError::Provider(other.to_string()),
        }
    }
}

impl From<LlmError> for SynthesisError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::MissingKey(msg) => SynthesisError::MissingCredential(msg),
            LlmError::Disabled => SynthesisError::MissingCredential("AI provider is set to none".into()),
            LlmError::Empty(_) => SynthesisError::EmptyOutput,
            other => SynthesisError::Provider(other.to_string()),
        }
    }
}

/// Map a reqwest failure, keeping timeouts distinct.
pub(crate) fn transport_error(e: reqwest::Error, timeout_secs: u64) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(timeout_secs)
    } else {
        LlmError::Network(e.without_url().to_string())
    }
}
