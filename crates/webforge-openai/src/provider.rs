// OpenAI Text Generator
//
// Implements the TextGenerator trait from webforge-core on top of the
// chat-completions endpoint, both as a single response and as an SSE stream.

use crate::types::{ChatMessage, ChatRequest, ChatResponse, StreamChunk};
use anyhow::{Context, Result};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{future, StreamExt};
use reqwest::Client;
use std::time::Duration;
use webforge_core::{BuildError, TextGenerator, TextStream};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Connection settings for the OpenAI API
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    /// API root, without the `/chat/completions` suffix
    pub base_url: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
    pub request_timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: None,
            max_tokens: None,
            system_prompt: None,
            request_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Upper bound for one HTTP request, streaming included
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// OpenAI-backed text generator
pub struct OpenAiTextGenerator {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiTextGenerator {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    fn request(&self, prompt: &str, stream: bool) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system_prompt) = &self.config.system_prompt {
            messages.push(ChatMessage::system(system_prompt.clone()));
        }
        messages.push(ChatMessage::user(prompt));

        ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream,
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .context("Failed to send OpenAI request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "OpenAI API request failed with status {}: {}",
                status,
                error_text
            );
        }
        Ok(response)
    }

    /// Non-streaming chat completion
    pub async fn chat_completion(&self, prompt: &str) -> Result<String> {
        let request = self.request(prompt, false);
        let response: ChatResponse = self
            .send(&request)
            .await?
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| anyhow::anyhow!("No choices in OpenAI response"))?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                finish_reason = ?choice.finish_reason,
                "OpenAI completion finished"
            );
        }

        Ok(choice.message.content.clone().unwrap_or_default())
    }

    /// Streaming chat completion; yields text deltas until `[DONE]`
    pub async fn chat_completion_stream(&self, prompt: &str) -> Result<TextStream> {
        let request = self.request(prompt, true);
        let response = self.send(&request).await?;

        let deltas = response
            .bytes_stream()
            .eventsource()
            .take_while(|event| {
                future::ready(!matches!(event, Ok(event) if event.data.trim() == "[DONE]"))
            })
            .filter_map(|event| {
                let item = match event {
                    Ok(event) => match serde_json::from_str::<StreamChunk>(&event.data) {
                        Ok(chunk) => chunk.text().map(|text| Ok(text.to_string())),
                        Err(e) => Some(Err(BuildError::generation(format!(
                            "Failed to parse OpenAI chunk: {}",
                            e
                        )))),
                    },
                    Err(e) => Some(Err(BuildError::generation(format!("Stream error: {}", e)))),
                };
                future::ready(item)
            });

        Ok(deltas.boxed())
    }
}

impl std::fmt::Debug for OpenAiTextGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiTextGenerator")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

// ============================================================================
// Core TextGenerator Implementation
// ============================================================================

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> webforge_core::Result<String> {
        self.chat_completion(prompt)
            .await
            .map_err(|e| BuildError::generation(e.to_string()))
    }

    async fn complete_stream(&self, prompt: &str) -> webforge_core::Result<TextStream> {
        self.chat_completion_stream(prompt)
            .await
            .map_err(|e| BuildError::generation(e.to_string()))
    }
}
