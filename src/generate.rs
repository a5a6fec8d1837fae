//! Answer generation via an external LLM.
//!
//! [`Generator`] is an optional collaborator: when absent (provider
//! `disabled`), the answer composer falls back to its deterministic template.
//! [`ChatGenerator`] speaks the OpenAI-compatible chat-completions wire
//! format, which covers OpenAI, Together, and Ollama with one client; only
//! the base URL and API key differ.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Capability contract: complete a prompt into answer text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier (e.g. `"mistralai/Mixtral-8x7B-Instruct-v0.1"`).
    fn model_name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Create the configured [`Generator`], or `None` when generation is
/// disabled and callers should use the deterministic fallback path.
pub fn create_generator(config: &LlmConfig) -> Result<Option<Box<dyn Generator>>> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "openai" | "together" | "ollama" => Ok(Some(Box::new(ChatGenerator::new(config)?))),
        other => Err(Error::Config(format!("unknown llm provider: '{}'", other))),
    }
}

/// OpenAI-compatible `POST {url}/chat/completions` client.
pub struct ChatGenerator {
    model: String,
    url: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl ChatGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| Error::Config("llm.model required when llm provider is set".into()))?;

        let url = config.url.clone().unwrap_or_else(|| {
            match config.provider.as_str() {
                "together" => "https://api.together.xyz/v1",
                "ollama" => "http://localhost:11434/v1",
                _ => "https://api.openai.com/v1",
            }
            .to_string()
        });

        // Ollama runs locally without a key; hosted providers need one.
        let api_key = match config.api_key_env.as_deref() {
            Some(env_name) => Some(std::env::var(env_name).map_err(|_| {
                Error::Config(format!("{} environment variable not set", env_name))
            })?),
            None => None,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::GenerationFailed(e.to_string()))?;

        Ok(Self {
            model,
            url,
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client,
        })
    }
}

#[async_trait]
impl Generator for ChatGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let endpoint = format!("{}/chat/completions", self.url.trim_end_matches('/'));
        let mut request = self.client.post(&endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::GenerationFailed(format!("{}: {}", endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::GenerationFailed(format!(
                "{} returned {}: {}",
                endpoint, status, detail
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::GenerationFailed(e.to_string()))?;

        // Strict shape validation: a malformed response falls back rather
        // than leaking partial JSON into the answer.
        let content = payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                Error::GenerationFailed("response missing choices[0].message.content".into())
            })?;

        Ok(content.trim().to_string())
    }
}
