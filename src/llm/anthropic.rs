//! Anthropic Claude API integration.
//!
//! # Environment Variables
//!
//! - `ANTHROPIC_API_KEY`: required API key for authentication.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EngineError, Result};
use crate::llm::LlmClient;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Sampling configuration for the Anthropic API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Temperature for sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Top-p sampling parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum output tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: Some(0.3),
            top_p: Some(1.0),
            max_tokens: Some(4096),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    content_type: String,
    text: Option<String>,
}

/// A client for the Anthropic Messages API, generic over model id so the
/// same client serves every configured model.
#[derive(Debug)]
pub struct AnthropicClient {
    api_key: String,
    generation_config: GenerationConfig,
    client: Client,
}

impl AnthropicClient {
    /// Create a new client from an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty or the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        if api_key.trim().is_empty() {
            return Err(EngineError::LlmAuth {
                message: "Anthropic API key cannot be empty".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| EngineError::LlmRequest {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(e),
            })?;

        Ok(Self {
            api_key,
            generation_config: GenerationConfig::default(),
            client,
        })
    }

    /// Create a client from the `ANTHROPIC_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable is not set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| EngineError::LlmAuth {
            message: "ANTHROPIC_API_KEY environment variable not set".to_string(),
        })?;
        Self::new(api_key)
    }

    /// Override the sampling configuration.
    #[must_use]
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = config;
        self
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(EngineError::Internal {
                message: "prompt cannot be empty".to_string(),
            });
        }

        let request = MessagesRequest {
            model: model.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.generation_config.max_tokens,
            temperature: self.generation_config.temperature,
            top_p: self.generation_config.top_p,
        };

        let url = format!("{ANTHROPIC_API_BASE}/messages");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| EngineError::LlmRequest {
                message: format!("failed to send request to Anthropic API: {e}"),
                source: Some(e),
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "unknown error".to_string());

            return Err(match status.as_u16() {
                401 | 403 => EngineError::LlmAuth {
                    message: format!("authentication failed: {error_text}"),
                },
                429 => EngineError::LlmRateLimit {
                    message: format!("rate limit exceeded: {error_text}"),
                    retry_after: None,
                },
                500..=599 => EngineError::LlmResponse {
                    message: format!("server error ({status}): {error_text}"),
                    status_code: Some(status.as_u16()),
                },
                _ => EngineError::LlmResponse {
                    message: format!("API error ({status}): {error_text}"),
                    status_code: Some(status.as_u16()),
                },
            });
        }

        let response_data: MessagesResponse = response.json().await.map_err(|e| EngineError::LlmResponse {
            message: format!("failed to parse API response: {e}"),
            status_code: None,
        })?;

        let text = response_data
            .content
            .first()
            .and_then(|c| c.text.clone())
            .ok_or_else(|| EngineError::LlmResponse {
                message: "no text in API response".to_string(),
                status_code: None,
            })?;

        if text.trim().is_empty() {
            return Err(EngineError::LlmResponse {
                message: "API returned empty response".to_string(),
                status_code: None,
            });
        }

        Ok(text)
    }
}
