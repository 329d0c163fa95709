//! Google Gemini `generateContent` client.
//!
//! The key travels in the `x-goog-api-key` header, never in the URL.

use serde::{Deserialize, Serialize};

use peoplesay_config::ResolvedLlmConfig;

use crate::backend::{api_error, http_client, CompletionBackend};
use crate::error::{transport_error, LlmError};

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout_secs: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiClient {
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

    /// Client against an explicit base URL (tests, proxies).
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

    /// `models/<name>` as the REST path expects it.
    fn model_path(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }
}

impl CompletionBackend for GeminiClient {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1beta/{}:generateContent", self.base_url, self.model_path());
        let request = GenerateRequest {
            contents: vec![Content { role: "user", parts: vec![RequestPart { text: prompt }] }],
            generation_config: GenerationConfig { temperature: self.temperature },
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(api_error(response));
        }

        let body: GenerateResponse =
            response.json().map_err(|e| LlmError::Parse(e.without_url().to_string()))?;
        extract_text(body)
    }

    fn verify_key(&self) -> Result<(), LlmError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
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

fn extract_text(body: GenerateResponse) -> Result<String, LlmError> {
    if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(LlmError::Empty(format!("prompt blocked: {}", reason)));
    }
    let Some(candidate) = body.candidates.into_iter().next() else {
        return Err(LlmError::Empty("no candidates".to_string()));
    };
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "no text".to_string());
        return Err(LlmError::Empty(reason));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer, key: &str) -> GeminiClient {
        GeminiClient::with_base_url(key.into(), "models/gemini-2.5-flash", server.base_url()).unwrap()
    }

    #[test]
    fn test_generate_content_joins_parts() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-2.5-flash:generateContent")
                .header("x-goog-api-key", "good-key");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "candidates": [{
                        "content": { "role": "model", "parts": [{ "text": "SELECT entry_id, " }, { "text": "data_unit FROM peoplesay" }] },
                        "finishReason": "STOP"
                    }]
                }));
        });

        let text = client(&server, "good-key").complete("question").unwrap();
        mock.assert();
        assert_eq!(text, "SELECT entry_id, data_unit FROM peoplesay");
    }

    #[test]
    fn test_bare_model_name_gets_prefix() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1beta/models/gemini-2.0-flash:generateContent");
            then.status(200).json_body(json!({
                "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
            }));
        });

        let client =
            GeminiClient::with_base_url("k".into(), "gemini-2.0-flash", server.base_url()).unwrap();
        assert_eq!(client.complete("p").unwrap(), "ok");
        mock.assert();
    }

    #[test]
    fn test_safety_block_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            }));
        });

        let err = client(&server, "k").complete("p").unwrap_err();
        assert_eq!(err, LlmError::Empty("SAFETY".into()));
    }

    #[test]
    fn test_blocked_prompt_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({
                "promptFeedback": { "blockReason": "OTHER" }
            }));
        });

        let err = client(&server, "k").complete("p").unwrap_err();
        assert!(matches!(err, LlmError::Empty(reason) if reason.contains("OTHER")));
    }

    #[test]
    fn test_invalid_key_is_auth_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1beta/models");
            then.status(400).json_body(json!({
                "error": { "code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT" }
            }));
        });

        let err = client(&server, "bad-key").verify_key().unwrap_err();
        mock.assert();
        assert!(err.is_auth());
        assert!(err.to_string().contains("API key not valid"));
    }

    #[test]
    fn test_verify_key_ok() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1beta/models").header("x-goog-api-key", "good-key");
            then.status(200).json_body(json!({ "models": [] }));
        });
        assert!(client(&server, "good-key").verify_key().is_ok());
    }

    #[test]
    fn test_server_error_keeps_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(503).body("overloaded");
        });
        let err = client(&server, "k").complete("p").unwrap_err();
        assert_eq!(err, LlmError::Api { status: 503, message: "overloaded".into() });
        assert!(!err.is_auth());
    }
}
