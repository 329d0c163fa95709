use std::sync::Arc;
use std::time::Duration;

use peoplesay_config::{LlmConfigStatus, LlmProvider, ResolvedLlmConfig};

use crate::error::LlmError;
use crate::gemini::GeminiClient;
use crate::openai::OpenAiClient;

/// One text-in, text-out model endpoint.
pub trait CompletionBackend {
    /// Send a single-turn prompt and return the model's text.
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Cheap authenticated call that proves the key is accepted.
    fn verify_key(&self) -> Result<(), LlmError>;

    fn model(&self) -> &str;
}

/// Backend shared by the translator and the synthesizer of one pipeline.
pub type SharedBackend = Arc<dyn CompletionBackend + Send + Sync>;

impl<T: CompletionBackend + ?Sized> CompletionBackend for Arc<T> {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).complete(prompt)
    }

    fn verify_key(&self) -> Result<(), LlmError> {
        (**self).verify_key()
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

/// Build the client for the resolved provider.
pub fn build_backend(config: &ResolvedLlmConfig) -> Result<SharedBackend, LlmError> {
    match config.status {
        LlmConfigStatus::Disabled => return Err(LlmError::Disabled),
        LlmConfigStatus::MissingKey => {
            return Err(LlmError::MissingKey(
                config.blocking_reason.clone().unwrap_or_else(|| "No API key found".to_string()),
            ))
        }
        LlmConfigStatus::Ready => {}
    }
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| LlmError::MissingKey("No API key found".to_string()))?;

    let backend: SharedBackend = match config.provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::from_config(config, api_key)?),
        LlmProvider::OpenAI => Arc::new(OpenAiClient::from_config(config, api_key)?),
        LlmProvider::None => return Err(LlmError::Disabled),
    };
    log::debug!("using {} model {}", config.provider_name(), backend.model());
    Ok(backend)
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, LlmError> {
    reqwest::blocking::Client::builder()
        .user_agent(format!("peoplesay/{}", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LlmError::Network(e.to_string()))
}

/// Read a failed response into `LlmError::Api`, preferring the provider's
/// `{"error": {"message": ...}}` text.
pub(crate) fn api_error(response: reqwest::blocking::Response) -> LlmError {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    #[derive(serde::Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    let status = response.status().as_u16();
    let text = response.text().unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.error.message,
        Err(_) if text.trim().is_empty() => "no response body".to_string(),
        Err(_) => text,
    };
    LlmError::Api { status, message }
}
