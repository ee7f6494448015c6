use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Core trait for chat-completion providers
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate completion for a given prompt
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse>;

    /// Rewrite a fetched article into a publishable body.
    async fn rewrite(&self, title: &str, content: &str) -> Result<String> {
        let response = self
            .generate(LlmRequest {
                prompt: rewrite_prompt(title, content),
                max_tokens: None,
                temperature: None,
                timeout_seconds: None,
            })
            .await?;

        let body = response.content.trim();
        if body.is_empty() {
            anyhow::bail!("LLM returned an empty rewrite for '{}'", title);
        }
        tracing::debug!(
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            "rewrite completed"
        );
        Ok(body.to_string())
    }
}

/// Request structure for LLM generation
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

/// Response from LLM generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

pub mod remote;

/// Fixed rewrite instruction sent as the single user message.
pub fn rewrite_prompt(title: &str, content: &str) -> String {
    format!(
        "Rewrite the following news article professionally, like a journalist would, for SEO and clarity. \
         Keep it under 800 words.\n\nTitle: {}\n\nContent: {}",
        title, content
    )
}
