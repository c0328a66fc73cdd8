//! HTTP client for an Ollama-compatible inference endpoint.
//!
//! One client serves both contracts: `/api/generate` for text synthesis and
//! `/api/chat` with attached images for vision captioning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{LlmClient, VisionClient};
use super::AnalysisError;

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 10;

pub struct EndpointClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl EndpointClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    /// Client for the given endpoint with the default 5-minute timeout.
    pub fn with_default_timeout(base_url: &str) -> Self {
        Self::new(base_url, DEFAULT_TIMEOUT_SECS)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Model names the endpoint currently serves.
    pub fn list_models(&self) -> Result<Vec<String>, AnalysisError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::Endpoint { status: status.as_u16(), body });
        }

        let parsed: TagsResponse = response
            .json()
            .map_err(|e| AnalysisError::ResponseParsing(e.to_string()))?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    /// Whether a model (by name prefix) is available on the endpoint.
    pub fn is_model_available(&self, model: &str) -> Result<bool, AnalysisError> {
        Ok(self.list_models()?.iter().any(|m| m.starts_with(model)))
    }

    fn map_send_error(&self, e: reqwest::Error) -> AnalysisError {
        if e.is_connect() {
            AnalysisError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            AnalysisError::RequestFailed(format!(
                "request timed out after {}s",
                self.timeout_secs
            ))
        } else {
            AnalysisError::RequestFailed(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<&'a str>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

impl LlmClient for EndpointClient {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, AnalysisError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest { model, prompt, system, stream: false };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::Endpoint { status: status.as_u16(), body });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| AnalysisError::ResponseParsing(e.to_string()))?;
        Ok(parsed.response)
    }
}

impl VisionClient for EndpointClient {
    fn describe_image(
        &self,
        model: &str,
        prompt: &str,
        image_base64: &str,
    ) -> Result<String, AnalysisError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
                images: vec![image_base64],
            }],
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::Endpoint { status: status.as_u16(), body });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| AnalysisError::ResponseParsing(e.to_string()))?;
        Ok(parsed.message.content)
    }
}

// ---------------------------------------------------------------------------
// Mocks
// ---------------------------------------------------------------------------

/// Mock text client — returns a configurable response or error.
pub struct MockLlmClient {
    response: Result<String, String>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self { response: Ok(response.to_string()) }
    }

    pub fn failing(error: &str) -> Self {
        Self { response: Err(error.to_string()) }
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, _model: &str, _prompt: &str, _system: &str) -> Result<String, AnalysisError> {
        self.response
            .clone()
            .map_err(AnalysisError::RequestFailed)
    }
}

/// Mock vision client — answers per call index, failing on listed indices.
pub struct MockVisionClient {
    responses: Vec<String>,
    fail_on: Vec<usize>,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockVisionClient {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|s| s.to_string()).collect(),
            fail_on: vec![],
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Fail the calls at these zero-based indices.
    pub fn failing_on(mut self, indices: &[usize]) -> Self {
        self.fail_on = indices.to_vec();
        self
    }
}

impl VisionClient for MockVisionClient {
    fn describe_image(
        &self,
        _model: &str,
        _prompt: &str,
        _image_base64: &str,
    ) -> Result<String, AnalysisError> {
        let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail_on.contains(&call) {
            return Err(AnalysisError::RequestFailed(format!(
                "mock failure on call {call}"
            )));
        }
        Ok(self
            .responses
            .get(call.min(self.responses.len().saturating_sub(1)))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = EndpointClient::new("http://localhost:11434/", 60);
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn chat_request_omits_empty_images() {
        let req = ChatRequest {
            model: "llava:7b",
            messages: vec![ChatMessage { role: "user", content: "hi", images: vec![] }],
            stream: false,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("images"));

        let req = ChatRequest {
            model: "llava:7b",
            messages: vec![ChatMessage { role: "user", content: "hi", images: vec!["QUJD"] }],
            stream: false,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"images\":[\"QUJD\"]"));
    }

    #[test]
    fn mock_llm_returns_configured_response() {
        let client = MockLlmClient::new("generated text");
        assert_eq!(
            client.generate("m", "p", "s").unwrap(),
            "generated text"
        );
    }

    #[test]
    fn mock_llm_failure_is_a_request_error() {
        let client = MockLlmClient::failing("endpoint down");
        assert!(matches!(
            client.generate("m", "p", "s"),
            Err(AnalysisError::RequestFailed(_))
        ));
    }

    #[test]
    fn mock_vision_fails_only_on_listed_calls() {
        let client = MockVisionClient::new(&["a", "b", "c"]).failing_on(&[1]);
        assert_eq!(client.describe_image("m", "p", "i").unwrap(), "a");
        assert!(client.describe_image("m", "p", "i").is_err());
        assert_eq!(client.describe_image("m", "p", "i").unwrap(), "c");
    }
}
