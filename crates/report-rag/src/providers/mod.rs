//! Provider abstractions for embeddings and language models
//!
//! Trait-based so the pipeline can switch between the hosted Gemini API, a
//! local Ollama server, and the offline hashing embedder.

pub mod embedding;
pub mod gemini;
pub mod hashing;
pub mod llm;
pub mod ollama;

pub use embedding::{EmbeddingProvider, RetryingEmbedder};
pub use gemini::{GeminiClient, GeminiEmbedder};
pub use hashing::HashEmbedder;
pub use llm::LlmProvider;
pub use ollama::{OllamaClient, OllamaEmbedder};

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Credentials, EmbeddingProviderKind, LlmProviderKind, RagConfig};
use crate::error::{Error, Result};
use crate::processing::RetryPolicy;

/// Shared HTTP client settings for the model services
fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_max_idle_per_host(5)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Build the configured language model
pub fn llm_from_config(config: &RagConfig, credentials: &Credentials) -> Result<Arc<dyn LlmProvider>> {
    let llm: Arc<dyn LlmProvider> = match config.llm.provider {
        LlmProviderKind::Gemini => Arc::new(GeminiClient::new(
            &config.llm,
            credentials.google_api_key()?.to_string(),
        )?),
        LlmProviderKind::Ollama => Arc::new(OllamaClient::new(&config.llm)?),
    };
    tracing::info!("LLM provider: {} ({})", llm.name(), llm.model());
    Ok(llm)
}

/// Build the configured embedder, wrapped in the retry policy
pub fn embedder_from_config(
    config: &RagConfig,
    credentials: &Credentials,
) -> Result<Arc<dyn EmbeddingProvider>> {
    let inner: Arc<dyn EmbeddingProvider> = match config.embeddings.provider {
        EmbeddingProviderKind::Gemini => Arc::new(GeminiEmbedder::new(
            &config.llm,
            &config.embeddings,
            credentials.google_api_key()?.to_string(),
        )?),
        EmbeddingProviderKind::Ollama => {
            Arc::new(OllamaEmbedder::new(&config.llm, &config.embeddings)?)
        }
        EmbeddingProviderKind::Hash => Arc::new(HashEmbedder::new(config.embeddings.dimensions)),
    };
    tracing::info!(
        "Embedding provider: {} ({} dimensions)",
        inner.name(),
        inner.dimensions()
    );
    Ok(Arc::new(RetryingEmbedder::new(
        inner,
        RetryPolicy::from_config(&config.retry),
    )))
}
