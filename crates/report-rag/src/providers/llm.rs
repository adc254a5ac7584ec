//! LLM provider trait for summaries and answers

use async_trait::async_trait;

use crate::error::Result;

/// Trait for LLM-based text generation
///
/// Implementations:
/// - `GeminiClient`: Generative Language API (gemini-2.5-flash)
/// - `OllamaClient`: Local Ollama server (llama3.2, phi3, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a fully rendered prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
