//! The chat model seam.
//!
//! Plan generation only needs "send one prompt, get one text completion
//! back". [`ChatModel`] captures that so the HTTP-backed
//! [`ChatCompletionClient`] can be swapped for scripted models in tests.

pub mod client;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use client::ChatCompletionClient;

/// Errors from a chat completion call.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no API key configured for the model provider (set FITPLAN_LLM_API_KEY)")]
    MissingApiKey,

    #[error("request to model provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode model provider response: {0}")]
    Decode(String),

    #[error("model provider returned no completion content")]
    EmptyCompletion,
}

/// A hosted chat-completion model.
///
/// Object-safe so it can be shared as `Arc<dyn ChatModel>`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Identifier sent to the provider (e.g. `google/gemini-2.5-flash`).
    fn model_id(&self) -> &str;

    /// Send `prompt` as a single user message and return the first choice's
    /// message content.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn ChatModel) {}
};

/// Connection settings for the model provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    /// Per-request timeout for the completion call.
    pub timeout: Duration,
}

impl LlmConfig {
    pub const DEFAULT_BASE_URL: &str = "https://ai.gateway.lovable.dev/v1";
    pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
    pub const DEFAULT_TEMPERATURE: f64 = 0.7;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// The API key, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            api_key: None,
            model: Self::DEFAULT_MODEL.to_owned(),
            temperature: Self::DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }
}
