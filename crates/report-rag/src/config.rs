//! Configuration for the report RAG pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "report-rag.toml";

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Document processed when no path is supplied
    pub document_path: DocumentPath,
    /// Server configuration
    pub server: ServerConfig,
    /// Element extraction configuration
    pub extractor: ExtractorConfig,
    /// Language model configuration
    pub llm: LlmConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Table summarization configuration
    pub summarization: SummarizationConfig,
    /// Retry policy for external calls
    pub retry: RetryConfig,
    /// Query-time retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Index persistence configuration
    pub store: StoreConfig,
}

/// Path of the report to ingest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DocumentPath(pub PathBuf);

impl Default for DocumentPath {
    fn default() -> Self {
        Self(PathBuf::from("data/qatar_test_doc.pdf"))
    }
}

impl AsRef<Path> for DocumentPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Conversation messages kept in memory; older ones are dropped
    pub max_history: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            enable_cors: true,
            max_body_size: 64 * 1024, // JSON bodies only
            max_history: 200,
        }
    }
}

/// Which extractor partitions the PDF
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// Unstructured partition API (table-aware)
    #[default]
    Unstructured,
    /// Local text-only extraction
    Local,
}

/// Element extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Extractor backend
    pub provider: ExtractorKind,
    /// Unstructured partition endpoint
    pub unstructured_url: String,
    /// Partition strategy ("hi_res" is required for table inference)
    pub strategy: String,
    /// Ask the partitioner to infer table structure
    pub infer_table_structure: bool,
    /// Chunking strategy applied by the partitioner
    pub chunking_strategy: String,
    /// Hard upper bound on a text block
    pub max_characters: usize,
    /// Soft bound after which a new block is started
    pub new_after_n_chars: usize,
    /// Blocks shorter than this are merged with their neighbour
    pub combine_text_under_n_chars: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Fall back to local extraction when the partition API fails
    pub fallback_to_local: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            provider: ExtractorKind::Unstructured,
            unstructured_url: "https://api.unstructuredapp.io/general/v0/general".to_string(),
            strategy: "hi_res".to_string(),
            infer_table_structure: true,
            chunking_strategy: "by_title".to_string(),
            max_characters: 4000,
            new_after_n_chars: 3800,
            combine_text_under_n_chars: 2000,
            timeout_secs: 300, // hi_res partitioning of a full report takes minutes
            fallback_to_local: true,
        }
    }
}

/// Language model backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    /// Google Generative Language API
    #[default]
    Gemini,
    /// Local Ollama server
    Ollama,
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend provider
    pub provider: LlmProviderKind,
    /// Generative Language API base URL
    pub gemini_base_url: String,
    /// Gemini model used for summaries and answers
    pub gemini_model: String,
    /// Ollama base URL
    pub ollama_base_url: String,
    /// Ollama generation model
    pub ollama_model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output tokens per call
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::Gemini,
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            gemini_model: "gemini-2.5-flash".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2:3b".to_string(),
            temperature: 0.0,
            max_output_tokens: 2048,
            timeout_secs: 120,
        }
    }
}

/// Embedding backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Google Generative Language API
    #[default]
    Gemini,
    /// Local Ollama server
    Ollama,
    /// Offline feature hashing
    Hash,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend provider
    pub provider: EmbeddingProviderKind,
    /// Gemini embedding model
    pub gemini_model: String,
    /// Ollama embedding model
    pub ollama_model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Texts per batch request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Gemini,
            gemini_model: "text-embedding-004".to_string(),
            ollama_model: "nomic-embed-text".to_string(),
            dimensions: 768,
            batch_size: 100, // batchEmbedContents accepts at most 100 requests
        }
    }
}

/// Table summarization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizationConfig {
    /// Concurrent summarize calls (default: CPU count, max 4)
    pub concurrency: Option<usize>,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            concurrency: None,
            timeout_secs: 120,
        }
    }
}

impl SummarizationConfig {
    /// Effective concurrency
    pub fn concurrency(&self) -> usize {
        self.concurrency
            .unwrap_or_else(|| num_cpus::get().min(4))
            .max(1)
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds
    pub base_backoff_ms: u64,
    /// Upper bound for a single delay in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 1000,
            max_backoff_ms: 30_000,
        }
    }
}

/// Query-time retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of elements returned per query
    pub top_k: usize,
    /// Drop hits below this cosine similarity
    pub min_similarity: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            min_similarity: None,
        }
    }
}

/// Index persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Persist both stores between runs
    pub persist: bool,
    /// Directory holding the snapshot
    pub persist_dir: PathBuf,
    /// Collection name (snapshot file stem)
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            persist: true,
            persist_dir: PathBuf::from("./vector_store"),
            collection: "qatar_report".to_string(),
        }
    }
}

impl RagConfig {
    /// Load configuration.
    ///
    /// Reads the given TOML file, or `report-rag.toml` in the working
    /// directory when present, then applies `REPORT_RAG_*` overrides from the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply overrides from a key lookup (normally the process environment)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("REPORT_RAG_DOCUMENT") {
            self.document_path = DocumentPath(PathBuf::from(value));
        }
        if let Some(value) = lookup("REPORT_RAG_HOST") {
            self.server.host = value;
        }
        if let Some(value) = lookup("REPORT_RAG_PORT") {
            self.server.port = value
                .parse()
                .map_err(|_| Error::Config(format!("Invalid REPORT_RAG_PORT: {}", value)))?;
        }
        if let Some(value) = lookup("REPORT_RAG_PERSIST_DIR") {
            self.store.persist_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("REPORT_RAG_UNSTRUCTURED_URL") {
            self.extractor.unstructured_url = value;
        }
        if let Some(value) = lookup("REPORT_RAG_EXTRACTOR") {
            self.extractor.provider = match value.to_lowercase().as_str() {
                "unstructured" => ExtractorKind::Unstructured,
                "local" => ExtractorKind::Local,
                other => return Err(Error::Config(format!("Unknown extractor: {}", other))),
            };
        }
        if let Some(value) = lookup("REPORT_RAG_LLM_PROVIDER") {
            self.llm.provider = match value.to_lowercase().as_str() {
                "gemini" => LlmProviderKind::Gemini,
                "ollama" => LlmProviderKind::Ollama,
                other => return Err(Error::Config(format!("Unknown LLM provider: {}", other))),
            };
        }
        if let Some(value) = lookup("REPORT_RAG_EMBEDDING_PROVIDER") {
            self.embeddings.provider = match value.to_lowercase().as_str() {
                "gemini" => EmbeddingProviderKind::Gemini,
                "ollama" => EmbeddingProviderKind::Ollama,
                "hash" => EmbeddingProviderKind::Hash,
                other => {
                    return Err(Error::Config(format!("Unknown embedding provider: {}", other)))
                }
            };
        }
        Ok(())
    }

    /// Check internal consistency and that required credentials are present
    pub fn validate(&self, credentials: &Credentials) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".to_string()));
        }
        if self.embeddings.dimensions == 0 || self.embeddings.batch_size == 0 {
            return Err(Error::Config(
                "embeddings.dimensions and embeddings.batch_size must be positive".to_string(),
            ));
        }
        let extractor = &self.extractor;
        if extractor.new_after_n_chars > extractor.max_characters
            || extractor.combine_text_under_n_chars > extractor.max_characters
        {
            return Err(Error::Config(
                "extractor chunk thresholds must not exceed max_characters".to_string(),
            ));
        }
        if self.requires_google_key() && credentials.google_api_key.is_none() {
            return Err(Error::Config(format!(
                "{} not found in environment variables",
                GOOGLE_API_KEY_VAR
            )));
        }
        Ok(())
    }

    /// Whether any selected provider talks to the Google API
    pub fn requires_google_key(&self) -> bool {
        self.llm.provider == LlmProviderKind::Gemini
            || self.embeddings.provider == EmbeddingProviderKind::Gemini
    }
}

/// Environment variable holding the Google API key
pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";
/// Environment variable holding the Unstructured API key
pub const UNSTRUCTURED_API_KEY_VAR: &str = "UNSTRUCTURED_API_KEY";

/// API credentials read once at startup
#[derive(Clone, Default)]
pub struct Credentials {
    /// Key for the Gemini generation and embedding APIs
    pub google_api_key: Option<String>,
    /// Key for the Unstructured partition API
    pub unstructured_api_key: Option<String>,
}

impl Credentials {
    /// Load `.env` (if any) and read credentials from the process environment
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through a key lookup; blank values count as absent
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            google_api_key: read(GOOGLE_API_KEY_VAR),
            unstructured_api_key: read(UNSTRUCTURED_API_KEY_VAR),
        }
    }

    /// The Google key, or a configuration error naming the variable
    pub fn google_api_key(&self) -> Result<&str> {
        self.google_api_key
            .as_deref()
            .ok_or_else(|| Error::Config(format!("{} is not set", GOOGLE_API_KEY_VAR)))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("google_api_key", &redact(&self.google_api_key))
            .field("unstructured_api_key", &redact(&self.unstructured_api_key))
            .finish()
    }
}
