//! Fakes shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use report_rag::config::RagConfig;
use report_rag::ingestion::ElementExtractor;
use report_rag::providers::{EmbeddingProvider, HashEmbedder, LlmProvider};
use report_rag::types::{Element, Extraction};
use report_rag::{AppContext, Result};

/// Wide enough that the test vocabulary hashes without collisions
pub const DIMENSIONS: usize = 1024;

pub const GDP_TEXT: &str = "Qatar GDP grew 3%.";
pub const GDP_TABLE: &str =
    "<table><tr><th>Year</th><th>Real</th></tr><tr><td>2023</td><td>3.0</td></tr></table>";
pub const GDP_SUMMARY: &str = "Table T1 shows GDP growth of 3% in 2023.";
pub const DEBT_TABLE: &str =
    "<table><tr><th>Year</th><th>Debt</th></tr><tr><td>2023</td><td>40</td></tr></table>";
pub const DEBT_SUMMARY: &str = "Table T2 shows public debt falling to 40 percent of output.";
pub const ANSWER: &str = "GDP grew by 3% in 2023.";

pub fn embedder() -> HashEmbedder {
    HashEmbedder::new(DIMENSIONS)
}

/// Elements of a small report, in document order
pub fn report_elements() -> Vec<Element> {
    vec![
        Element::text(0, GDP_TEXT).with_page(Some(1)),
        Element::table(1, GDP_TABLE, Some(GDP_TABLE.to_string())).with_page(Some(1)),
        Element::text(2, "Inflation eased to 2.5 percent.").with_page(Some(2)),
        Element::table(3, DEBT_TABLE, None).with_page(Some(3)),
    ]
}

/// Extractor returning a fixed element list
pub struct FakeExtractor {
    elements: Vec<Element>,
}

impl FakeExtractor {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }
}

#[async_trait]
impl ElementExtractor for FakeExtractor {
    async fn extract(&self, _path: &Path) -> Result<Extraction> {
        Ok(Extraction::new(self.elements.clone()))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Language model with canned summaries and a fixed answer
pub struct FakeLlm {
    summaries: HashMap<String, String>,
    delay: Duration,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    pub fn new() -> Self {
        let summaries = HashMap::from([
            (GDP_TABLE.to_string(), GDP_SUMMARY.to_string()),
            (DEBT_TABLE.to_string(), DEBT_SUMMARY.to_string()),
        ]);
        Self {
            summaries,
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    pub fn answer_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .iter()
            .filter(|p| p.starts_with("Answer the question"))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        tokio::time::sleep(self.delay).await;

        if let Some((_, table)) = prompt.split_once("Table Data: ") {
            return Ok(self
                .summaries
                .get(table)
                .cloned()
                .unwrap_or_else(|| format!("Summary of {}", table)));
        }
        Ok(ANSWER.to_string())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-llm"
    }
}

/// Hash embedder that takes its time over batches
pub struct SlowEmbedder {
    inner: HashEmbedder,
    delay: Duration,
}

impl SlowEmbedder {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: embedder(),
            delay,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        // Same vectors as the hash embedder
        self.inner.name()
    }
}

/// In-memory configuration with fast retries
pub fn test_config() -> RagConfig {
    let mut config = RagConfig::default();
    config.store.persist = false;
    config.embeddings.dimensions = DIMENSIONS;
    config.summarization.concurrency = Some(2);
    config.summarization.timeout_secs = 5;
    config.retry.base_backoff_ms = 1;
    config.retry.max_backoff_ms = 2;
    config
}

pub fn context_with(llm: Arc<FakeLlm>, elements: Vec<Element>) -> AppContext {
    AppContext::from_parts(
        test_config(),
        Arc::new(FakeExtractor::new(elements)),
        llm,
        Arc::new(embedder()),
    )
}
