//! OpenAI `chat/completions` client.

use serde::{Deserialize, Serialize};

use peoplesay_config::ResolvedLlmConfig;

use crate::backend::{api_error, http_client, CompletionBackend};
use crate::error::{transport_error, LlmError};

#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn from_config(config: &ResolvedLlmConfig, api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn with_base_url(api_key: String, model: &str, base_url: String) -> Result<Self, LlmError> {
        Ok(Self {
            http: http_client(30)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            temperature: 0.2,
            timeout_secs: 30,
        })
    }
}

impl CompletionBackend for OpenAiClient {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request = OpenAIRequest {
            model: &self.model,
            messages: vec![OpenAIMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(api_error(response));
        }

        let body: OpenAIResponse =
            response.json().map_err(|e| LlmError::Parse(e.without_url().to_string()))?;
        let Some(choice) = body.choices.into_iter().next() else {
            return Err(LlmError::Empty("no choices".to_string()));
        };
        match choice.message.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(LlmError::Empty(choice.finish_reason.unwrap_or_else(|| "no text".to_string()))),
        }
    }

    fn verify_key(&self) -> Result<(), LlmError> {
        let response = self
            .http
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let err = api_error(response);
            log::warn!("API key verification failed: {}", err);
            Err(err)
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}
