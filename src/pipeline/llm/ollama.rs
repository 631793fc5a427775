use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{LlmClient, VisionClient};
use super::LlmError;

/// Ollama HTTP client for local LLM inference.
///
/// Blocking: build it outside the async runtime and call it from worker threads only.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a client for the Ollama instance at `base_url`.
    ///
    /// `timeout_secs` bounds one HTTP exchange. Stage deadlines are enforced separately.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_connect() {
            LlmError::OllamaConnection(self.base_url.clone())
        } else if e.is_timeout() {
            LlmError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            LlmError::HttpClient(e.to_string())
        }
    }

    fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, LlmError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Request body for Ollama /api/chat
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct OllamaChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "no_images")]
    images: &'a [String],
}

fn no_images(images: &&[String]) -> bool {
    images.is_empty()
}

/// Response body from Ollama /api/chat
#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaChatReply,
}

#[derive(Deserialize)]
struct OllamaChatReply {
    content: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl LlmClient for OllamaClient {
    fn generate(&self, model: &str, prompt: &str, system: Option<&str>) -> Result<String, LlmError> {
        let body = OllamaGenerateRequest {
            model,
            prompt,
            system,
            stream: false,
        };
        let parsed: OllamaGenerateResponse = self.post_json("/api/generate", &body)?;
        Ok(parsed.response)
    }

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

impl VisionClient for OllamaClient {
    fn chat_with_images(
        &self,
        model: &str,
        prompt: &str,
        images: &[String],
        system: Option<&str>,
    ) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(OllamaChatMessage {
                role: "system",
                content: system,
                images: &[],
            });
        }
        messages.push(OllamaChatMessage {
            role: "user",
            content: prompt,
            images,
        });

        let body = OllamaChatRequest {
            model,
            messages,
            stream: false,
        };
        let parsed: OllamaChatResponse = self.post_json("/api/chat", &body)?;
        Ok(parsed.message.content)
    }
}

/// Mock LLM client for tests. Answers every call with a fixed response.
pub struct MockLlmClient {
    response: Result<String, String>,
    delay: Option<Duration>,
    available_models: Vec<String>,
    calls: AtomicUsize,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            delay: None,
            available_models: vec!["mistral:latest".to_string()],
            calls: AtomicUsize::new(0),
        }
    }

    /// A client whose every call fails as if Ollama were down.
    pub fn failing(reason: &str) -> Self {
        Self {
            response: Err(reason.to_string()),
            ..Self::new("")
        }
    }

    /// Sleep before answering, to exercise stage deadlines.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.response
            .clone()
            .map_err(LlmError::OllamaConnection)
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, _model: &str, _prompt: &str, _system: Option<&str>) -> Result<String, LlmError> {
        self.respond()
    }

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError> {
        Ok(self.available_models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(self.available_models.clone())
    }
}

impl VisionClient for MockLlmClient {
    fn chat_with_images(
        &self,
        _model: &str,
        _prompt: &str,
        _images: &[String],
        _system: Option<&str>,
    ) -> Result<String, LlmError> {
        self.respond()
    }
}
