use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Core trait for generation providers (text and images)
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate completion for a given prompt
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse>;

    /// Generate one image and return its URL, or `None` when the service returned no URL
    async fn generate_image(&self, request: ImageRequest) -> Result<Option<String>>;
}

/// Request structure for LLM generation.
/// Model, timeout, token limit and temperature are provider settings.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
}

impl LlmRequest {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text; empty when the service returned a null message
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    /// e.g. "1024x1024"
    pub size: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

pub mod remote;
