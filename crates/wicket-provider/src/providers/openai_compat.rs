//! Generic OpenAI-compatible provider.
//!
//! Handles the OpenAI chat completions API format used by OpenAI, Ollama,
//! OpenRouter, Perplexity, and many other backends.

use crate::error::ProviderError;
use crate::traits::Provider;
use crate::types::ProviderMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for an OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    pub base_url: String,
    pub api_key: String,
    pub provider_name: String,
    pub model: String,
}

/// A provider that speaks the OpenAI chat completions protocol.
pub struct OpenAiCompatProvider {
    config: OpenAiCompatConfig,
    client: Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_empty() {
            return Err(ProviderError::Auth(format!(
                "No API key configured for provider '{}'",
                config.provider_name
            )));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("wicket/0.1")
            .build()?;
        Ok(Self { config, client })
    }

    /// OpenAI against api.openai.com.
    pub fn openai(api_key: String, model: String) -> Result<Self, ProviderError> {
        Self::new(OpenAiCompatConfig {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key,
            provider_name: "openai".to_string(),
            model,
        })
    }

    fn build_request_body(&self, messages: &[ProviderMessage]) -> Value {
        json!({
            "model": self.config.model,
            "messages": messages
                .iter()
                .map(|m| json!({"role": m.role, "content": m.content}))
                .collect::<Vec<_>>(),
            "stream": false,
        })
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.provider_name
    }

    async fn complete(&self, messages: &[ProviderMessage]) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = self.build_request_body(messages);

        tracing::debug!(provider = %self.config.provider_name, model = %self.config.model, "provider request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::ApiError(format!("HTTP {status}: {text}")));
        }

        let completion: ChatCompletion = serde_json::from_str(&text)?;
        extract_content(completion)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn extract_content(completion: ChatCompletion) -> Result<String, ProviderError> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.is_empty())
        .ok_or(ProviderError::EmptyResponse)
}
