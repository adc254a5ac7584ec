//! Long-lived application context: the pipeline from document to answer

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::{Credentials, RagConfig};
use crate::error::{Error, Result};
use crate::generation::AnsweringStage;
use crate::ingestion::{self, ElementExtractor};
use crate::processing::{RetryPolicy, SummaryProgress, TableSummarizer};
use crate::providers::{self, EmbeddingProvider, LlmProvider};
use crate::retrieval::{IndexInput, RetrieverBinding};
use crate::types::{Answer, ChatMessage, ChatRole, IndexStats, ProcessReport};

/// Stage of a document build, reported to progress callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStage {
    /// Partitioning the document
    Extracting,
    /// Summarizing tables
    Summarizing { completed: usize, total: usize },
    /// Embedding surrogates and building the index
    Indexing,
}

/// Everything a session needs, constructed once from validated configuration
pub struct AppContext {
    config: RagConfig,
    extractor: Arc<dyn ElementExtractor>,
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    summarizer: TableSummarizer,
    answering: AnsweringStage,
    binding: RetrieverBinding,
    process_lock: tokio::sync::Mutex<()>,
    history: RwLock<Vec<ChatMessage>>,
}

impl AppContext {
    /// Validate configuration and credentials, then construct providers
    pub fn from_config(config: RagConfig, credentials: &Credentials) -> Result<Self> {
        config.validate(credentials)?;

        let extractor = ingestion::from_config(&config.extractor, credentials)?;
        let llm = providers::llm_from_config(&config, credentials)?;
        let embedder = providers::embedder_from_config(&config, credentials)?;

        Ok(Self::from_parts(config, extractor, llm, embedder))
    }

    /// Assemble from already constructed collaborators
    pub fn from_parts(
        config: RagConfig,
        extractor: Arc<dyn ElementExtractor>,
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        let summarizer = TableSummarizer::new(llm.clone(), &config.summarization, retry);
        let answering = AnsweringStage::new(llm.clone(), &config.llm, retry);
        let binding = RetrieverBinding::open(&config.store, &config.retrieval, embedder.as_ref());

        Self {
            config,
            extractor,
            llm,
            embedder,
            summarizer,
            answering,
            binding,
            process_lock: tokio::sync::Mutex::new(()),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Get the retriever binding
    pub fn binding(&self) -> &RetrieverBinding {
        &self.binding
    }

    /// Get the language model
    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Get the embedder
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Extract, summarize, and index a document, replacing any previous index.
    ///
    /// Cancellation is honored until indexing starts; once embedding begins
    /// the build runs to completion so the swap stays atomic.
    pub async fn process_document(
        &self,
        path: &Path,
        cancel: &CancellationToken,
        progress: &(dyn Fn(ProcessStage) + Send + Sync),
    ) -> Result<ProcessReport> {
        let _guard = self
            .process_lock
            .try_lock()
            .map_err(|_| Error::BuildInProgress)?;
        let start = Instant::now();
        let document = path.display().to_string();
        tracing::info!("Processing {}", document);

        progress(ProcessStage::Extracting);
        let extraction = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = self.extractor.extract(path) => result?,
        };
        let (texts, tables) = extraction.split();

        let summaries = self
            .summarizer
            .summarize_tables(tables, cancel, &|p: SummaryProgress| {
                progress(ProcessStage::Summarizing {
                    completed: p.completed,
                    total: p.total,
                })
            })
            .await?;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        progress(ProcessStage::Indexing);

        let mut input = IndexInput::new(document.clone(), texts, summaries);
        if let Some(digest) = file_sha256(path).await {
            input = input.with_sha256(digest);
        }
        let snapshot = self.binding.build(input, self.embedder.as_ref()).await?;

        let report = ProcessReport {
            document,
            text_elements: snapshot.meta.text_records,
            table_elements: snapshot.meta.table_records,
            records: snapshot.len(),
            built_at: snapshot.meta.built_at,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            "Processed {} in {}ms: {} text blocks, {} tables",
            report.document,
            report.elapsed_ms,
            report.text_elements,
            report.table_elements
        );
        Ok(report)
    }

    /// Answer a question from the current index and record the exchange
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::Validation("Question cannot be empty".to_string()));
        }
        self.record(ChatMessage::new(ChatRole::User, question));

        let retrieved = self.binding.retrieve(question, self.embedder.as_ref()).await?;
        let answer = self.answering.answer(question, retrieved).await?;

        self.record(ChatMessage::new(ChatRole::Assistant, answer.answer.clone()));
        Ok(answer)
    }

    fn record(&self, message: ChatMessage) {
        let limit = self.config.server.max_history;
        let mut history = self.history.write();
        history.push(message);
        if history.len() > limit {
            let excess = history.len() - limit;
            history.drain(..excess);
        }
    }

    /// Most recent conversation messages, oldest first
    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.read().clone()
    }

    /// Index status
    pub fn stats(&self) -> IndexStats {
        self.binding.stats()
    }
}

/// Hex SHA-256 of a file; `None` when it cannot be read
async fn file_sha256(path: &Path) -> Option<String> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(hex::encode(Sha256::digest(&bytes))),
        Err(e) => {
            tracing::debug!("Not fingerprinting {}: {}", path.display(), e);
            None
        }
    }
}
