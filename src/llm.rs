//! Language-model backends.
//!
//! Every provider is reduced to one operation: send a single text prompt,
//! get a single text completion back. The pipeline only sees the
//! [`LanguageModel`] trait, so tests can substitute a scripted fake.

use crate::config::{ChatEndpointSettings, OllamaSettings, Settings};
use crate::error::{DigestError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Sampling temperature for local and OpenAI-compatible models
const DETERMINISTIC_TEMPERATURE: f32 = 0.0;

/// Hugging Face router settings carried over from the hosted setup
const HF_TEMPERATURE: f32 = 0.2;
const HF_MAX_TOKENS: u32 = 512;

/// A text-in, text-out inference endpoint.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion for `prompt`.
    async fn invoke(&self, prompt: &str) -> Result<String>;

    /// Model identifier for logging
    fn model_id(&self) -> &str;
}

/// Backend selected by `MODEL_PROVIDER`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    /// Local Ollama server
    Ollama,
    /// Hugging Face inference router
    HfApi,
    /// Any OpenAI-compatible chat-completions endpoint
    OpenAi,
}

impl FromStr for ModelProvider {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "OLLAMA" => Ok(Self::Ollama),
            "HF_API" => Ok(Self::HfApi),
            "OPENAI" => Ok(Self::OpenAi),
            other => Err(DigestError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Build the backend named in the settings.
///
/// Fails for unknown providers and for hosted providers without credentials,
/// so a misconfigured run stops before any file is touched.
pub fn load_model(settings: &Settings) -> Result<Box<dyn LanguageModel>> {
    let provider: ModelProvider = settings.model_provider.parse()?;
    let client = http_client(settings.request_timeout)?;

    match provider {
        ModelProvider::Ollama => {
            info!(model = %settings.ollama.model, "Using Ollama model");
            Ok(Box::new(OllamaModel::new(client, &settings.ollama)))
        }
        ModelProvider::HfApi => {
            info!(model = %settings.huggingface.model, "Using HuggingFace Inference API model");
            let hf = &settings.huggingface;
            let token = hf
                .api_key
                .clone()
                .ok_or(DigestError::MissingSetting("HF_TOKEN"))?;
            let base_url = hf
                .base_url
                .as_deref()
                .ok_or(DigestError::MissingSetting("HF_BASE_URL"))?;
            Ok(Box::new(
                ChatCompletionsModel::new(client, base_url, &hf.model, Some(token))
                    .with_temperature(HF_TEMPERATURE)
                    .with_max_tokens(HF_MAX_TOKENS),
            ))
        }
        ModelProvider::OpenAi => {
            info!(model = %settings.openai.model, "Using OpenAI-compatible model");
            Ok(Box::new(openai_model(client, &settings.openai)?))
        }
    }
}

fn openai_model(client: reqwest::Client, endpoint: &ChatEndpointSettings) -> Result<ChatCompletionsModel> {
    let base_url = endpoint
        .base_url
        .as_deref()
        .ok_or(DigestError::MissingSetting("LLM_BASE_URL"))?;
    Ok(ChatCompletionsModel::new(
        client,
        base_url,
        &endpoint.model,
        endpoint.api_key.clone(),
    ))
}

/// Shared HTTP client; `None` leaves requests without a deadline.
pub fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| DigestError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-2xx response into [`DigestError::Api`].
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(DigestError::Api {
        code: status.as_u16(),
        message: error_text,
    })
}

// ============================================================================
// Ollama
// ============================================================================

/// Ollama `/api/generate` response (non-streaming)
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Local model served by Ollama
pub struct OllamaModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaModel {
    pub fn new(client: reqwest::Client, settings: &OllamaSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        }
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": DETERMINISTIC_TEMPERATURE }
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending Ollama request");

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(prompt))
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| DigestError::MalformedResponse(format!("Ollama response: {}", e)))?;
        Ok(body.response)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// OpenAI-compatible chat completions
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl ChatCompletionResponse {
    fn into_content(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| DigestError::MalformedResponse("completion has no choices".to_string()))
    }
}

/// Hosted model behind an OpenAI-compatible `/chat/completions` endpoint
pub struct ChatCompletionsModel {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ChatCompletionsModel {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        model: &str,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            api_url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            temperature: DETERMINISTIC_TEMPERATURE,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": self.temperature,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsModel {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending chat completion request");

        let mut request = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt));
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = ensure_success(request.send().await?).await?;
        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| DigestError::MalformedResponse(format!("chat completion: {}", e)))?;
        completion.into_content()
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
