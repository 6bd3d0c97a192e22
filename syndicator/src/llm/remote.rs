use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{ImageRequest, LlmProvider, LlmRequest, LlmResponse, UsageMetadata};

/// Remote generation provider using OpenAI-compatible HTTP API
pub struct RemoteLlmProvider {
    base_url: String,
    images_url: String,
    api_key: String,
    model: String,
    image_model: String,
    default_timeout: Duration,
    default_max_tokens: Option<usize>,
    default_temperature: Option<f32>,
    client: reqwest::Client,
}

impl RemoteLlmProvider {
    /// `base_url` is the chat completions endpoint. The image endpoint is inferred
    /// from it until overridden with [`RemoteLlmProvider::with_images_url`].
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            images_url: infer_images_url(&base_url),
            base_url,
            api_key: api_key.into(),
            model: model.into(),
            image_model: "dall-e-3".to_string(),
            default_timeout: Duration::from_secs(120),
            default_max_tokens: None,
            default_temperature: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_images_url(mut self, images_url: impl Into<String>) -> Self {
        self.images_url = images_url.into();
        self
    }

    pub fn with_image_model(mut self, image_model: impl Into<String>) -> Self {
        self.image_model = image_model.into();
        self
    }

    pub fn with_defaults(
        mut self,
        timeout_secs: u64,
        max_tokens: Option<usize>,
        temperature: Option<f32>,
    ) -> Self {
        self.default_timeout = Duration::from_secs(timeout_secs);
        self.default_max_tokens = max_tokens;
        self.default_temperature = temperature;
        self
    }

    pub fn images_url(&self) -> &str {
        &self.images_url
    }
}

/// Derive the image generation endpoint from the chat endpoint
/// e.g. https://api.openai.com/v1/chat/completions -> https://api.openai.com/v1/images/generations
fn infer_images_url(base_url: &str) -> String {
    if base_url.ends_with("/images/generations") {
        base_url.to_string()
    } else if base_url.ends_with("/chat/completions") {
        base_url.replace("/chat/completions", "/images/generations")
    } else {
        format!("{}/images/generations", base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl LlmProvider for RemoteLlmProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let timeout = self.default_timeout;

        // Build OpenAI-compatible request
        let req_body = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: Some(request.prompt),
            }],
            max_tokens: self.default_max_tokens,
            temperature: self.default_temperature,
        };

        // Make HTTP request with timeout
        let response = tokio::time::timeout(
            timeout,
            self.client
                .post(&self.base_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&req_body)
                .send(),
        )
        .await
        .context("LLM request timed out")?
        .context("LLM HTTP request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error {}: {}", status, body);
        }

        let resp_body: OpenAiResponse = tokio::time::timeout(timeout, response.json())
            .await
            .context("LLM request timed out")?
            .context("Failed to parse LLM response")?;

        let choice = resp_body
            .choices
            .into_iter()
            .next()
            .context("LLM response has no choices")?;

        let usage = resp_body
            .usage
            .map(|u| UsageMetadata {
                prompt_tokens: u.prompt_tokens.unwrap_or(0),
                completion_tokens: u.completion_tokens.unwrap_or(0),
                total_tokens: u.total_tokens.unwrap_or(0),
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            model: resp_body.model.unwrap_or_else(|| self.model.clone()),
        })
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<Option<String>> {
        let req_body = ImageGenerationRequest {
            model: self.image_model.clone(),
            prompt: request.prompt,
            n: 1,
            size: request.size,
        };

        let response = tokio::time::timeout(
            self.default_timeout,
            self.client
                .post(&self.images_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&req_body)
                .send(),
        )
        .await
        .context("Image request timed out")?
        .context("Image HTTP request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Image API error {}: {} (URL: {})", status, body, self.images_url);
        }

        let resp_body: ImageGenerationResponse = tokio::time::timeout(self.default_timeout, response.json())
            .await
            .context("Image request timed out")?
            .context("Failed to parse image response")?;

        debug!("image response carried {} entries", resp_body.data.len());

        Ok(resp_body
            .data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .filter(|u| !u.is_empty()))
    }
}

// OpenAI API request/response structures
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<usize>,
    #[serde(default)]
    completion_tokens: Option<usize>,
    #[serde(default)]
    total_tokens: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_url_is_inferred_from_chat_endpoint() {
        assert_eq!(
            infer_images_url("https://api.openai.com/v1/chat/completions"),
            "https://api.openai.com/v1/images/generations"
        );
        assert_eq!(
            infer_images_url("http://localhost:8080/v1/"),
            "http://localhost:8080/v1/images/generations"
        );
    }

    #[test]
    fn explicit_images_url_wins() {
        let provider = RemoteLlmProvider::new("http://a/v1/chat/completions", "k", "m")
            .with_images_url("http://b/img");
        assert_eq!(provider.images_url(), "http://b/img");
    }
}
