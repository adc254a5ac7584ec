//! The retriever binding: builds and queries the dual-store index

use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{RetrievalConfig, StoreConfig};
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Element, ElementKind, IndexStats, RetrievedElement, SummarizedTable};

use super::payload_store::PayloadStore;
use super::persistence::SnapshotFile;
use super::search_store::{SearchStore, SurrogateRecord};
use super::snapshot::{IndexSnapshot, SnapshotMeta};

/// Everything a build indexes
#[derive(Debug, Clone, Default)]
pub struct IndexInput {
    /// Source document name
    pub document: String,
    /// SHA-256 of the document bytes, hex encoded
    pub document_sha256: Option<String>,
    /// Text elements in document order
    pub texts: Vec<Element>,
    /// Tables paired with their summaries, in document order
    pub tables: Vec<SummarizedTable>,
}

impl IndexInput {
    pub fn new(document: impl Into<String>, texts: Vec<Element>, tables: Vec<SummarizedTable>) -> Self {
        Self {
            document: document.into(),
            document_sha256: None,
            texts,
            tables,
        }
    }

    /// Pair tables with positionally aligned summaries.
    ///
    /// Fails unless there is exactly one summary per table.
    pub fn from_parallel(
        document: impl Into<String>,
        texts: Vec<Element>,
        tables: Vec<Element>,
        summaries: Vec<String>,
    ) -> Result<Self> {
        if tables.len() != summaries.len() {
            return Err(Error::Validation(format!(
                "got {} summaries for {} tables; every table needs exactly one summary",
                summaries.len(),
                tables.len()
            )));
        }
        let tables = tables
            .into_iter()
            .zip(summaries)
            .map(|(table, summary)| SummarizedTable { table, summary })
            .collect();
        Ok(Self::new(document, texts, tables))
    }

    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.document_sha256 = Some(digest.into());
        self
    }

    /// Reject elements filed under the wrong kind
    fn check_kinds(&self) -> Result<()> {
        if let Some(e) = self.texts.iter().find(|e| e.kind != ElementKind::Text) {
            return Err(Error::Validation(format!(
                "element at position {} is a {}, expected text",
                e.position, e.kind
            )));
        }
        if let Some(pair) = self.tables.iter().find(|p| p.table.kind != ElementKind::Table) {
            return Err(Error::Validation(format!(
                "element at position {} is a {}, expected table",
                pair.table.position, pair.table.kind
            )));
        }
        Ok(())
    }

    /// Split into (surrogate, payload) pairs: text is its own surrogate,
    /// a table is represented by its summary
    fn into_entries(self) -> Vec<(String, Element)> {
        let texts = self.texts.into_iter().map(|e| (e.content.clone(), e));
        let tables = self.tables.into_iter().map(|p| (p.summary, p.table));
        texts.chain(tables).collect()
    }
}

/// Joins a search store over surrogates to a payload store of originals.
///
/// Queries read an immutable snapshot; a build assembles a new snapshot off
/// to the side and swaps it in, so a query never sees a half-built index.
/// At most one build runs at a time.
pub struct RetrieverBinding {
    current: RwLock<Option<Arc<IndexSnapshot>>>,
    build_lock: tokio::sync::Mutex<()>,
    snapshot_file: Option<SnapshotFile>,
    collection: String,
    top_k: usize,
    min_similarity: Option<f32>,
}

impl RetrieverBinding {
    /// Binding that keeps its index in memory only
    pub fn in_memory(collection: impl Into<String>, retrieval: &RetrievalConfig) -> Self {
        Self {
            current: RwLock::new(None),
            build_lock: tokio::sync::Mutex::new(()),
            snapshot_file: None,
            collection: collection.into(),
            top_k: retrieval.top_k,
            min_similarity: retrieval.min_similarity,
        }
    }

    /// Binding backed by the configured snapshot file.
    ///
    /// Loads a previous build when one exists and was embedded by a
    /// compatible provider. An unreadable or inconsistent snapshot is
    /// ignored; the binding starts not ready and the next build replaces it.
    pub fn open(
        store: &StoreConfig,
        retrieval: &RetrievalConfig,
        embedder: &dyn EmbeddingProvider,
    ) -> Self {
        let mut binding = Self::in_memory(store.collection.clone(), retrieval);
        if !store.persist {
            return binding;
        }

        let file = SnapshotFile::new(&store.persist_dir, &store.collection);
        match file.load() {
            Ok(Some(snapshot))
                if snapshot.meta.embedder == embedder.name()
                    && snapshot.meta.dimensions == embedder.dimensions() =>
            {
                tracing::info!(
                    "Loaded index for {} ({} records) from {}",
                    snapshot.meta.document,
                    snapshot.len(),
                    file.path().display()
                );
                *binding.current.get_mut() = Some(Arc::new(snapshot));
            }
            Ok(Some(snapshot)) => {
                tracing::warn!(
                    "Ignoring index at {}: built with {} ({} dims), current embedder is {} ({} dims)",
                    file.path().display(),
                    snapshot.meta.embedder,
                    snapshot.meta.dimensions,
                    embedder.name(),
                    embedder.dimensions()
                );
            }
            Ok(None) => tracing::debug!("No index at {}", file.path().display()),
            Err(e) => tracing::warn!("Ignoring unusable index: {}", e),
        }

        binding.snapshot_file = Some(file);
        binding
    }

    /// Whether a build has completed
    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    /// The index queries currently see
    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.current.read().clone()
    }

    /// Number of elements returned per query
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Rebuild both stores from scratch and swap them in.
    ///
    /// Mints one fresh identifier per element. On any failure the previous
    /// index stays in place.
    pub async fn build(
        &self,
        input: IndexInput,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Arc<IndexSnapshot>> {
        let _guard = self
            .build_lock
            .try_lock()
            .map_err(|_| Error::BuildInProgress)?;

        input.check_kinds()?;
        let document = input.document.clone();
        let document_sha256 = input.document_sha256.clone();
        let text_records = input.texts.len();
        let table_records = input.tables.len();

        let entries = input.into_entries();
        let surrogates: Vec<String> = entries.iter().map(|(s, _)| s.clone()).collect();

        tracing::info!(
            "Indexing {} text blocks and {} table summaries with {}",
            text_records,
            table_records,
            embedder.name()
        );
        let embeddings = if surrogates.is_empty() {
            Vec::new()
        } else {
            embedder.embed_batch(&surrogates).await?
        };
        if embeddings.len() != surrogates.len() {
            return Err(Error::generation(format!(
                "embedder returned {} vectors for {} surrogates",
                embeddings.len(),
                surrogates.len()
            )));
        }

        let mut search = SearchStore::new(embedder.dimensions());
        let mut payload = PayloadStore::new();
        for ((surrogate, element), embedding) in entries.into_iter().zip(embeddings) {
            let id = Uuid::new_v4();
            search.insert(SurrogateRecord {
                id,
                surrogate,
                embedding,
            })?;
            payload.insert(id, element)?;
        }

        let snapshot = IndexSnapshot::new(
            SnapshotMeta {
                collection: self.collection.clone(),
                document,
                document_sha256,
                built_at: Utc::now(),
                text_records,
                table_records,
                embedder: embedder.name().to_string(),
                dimensions: embedder.dimensions(),
            },
            search,
            payload,
        );
        snapshot.verify()?;
        let snapshot = Arc::new(snapshot);

        if let Some(file) = self.snapshot_file.clone() {
            let to_save = snapshot.clone();
            tokio::task::spawn_blocking(move || file.save(&to_save))
                .await
                .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;
        }

        *self.current.write() = Some(snapshot.clone());
        tracing::info!(
            "Index ready: {} records ({} text, {} table)",
            snapshot.len(),
            text_records,
            table_records
        );

        Ok(snapshot)
    }

    /// Build from tables and summaries given as parallel sequences.
    ///
    /// A length mismatch fails before anything is embedded or stored.
    pub async fn build_aligned(
        &self,
        document: impl Into<String>,
        texts: Vec<Element>,
        tables: Vec<Element>,
        summaries: Vec<String>,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Arc<IndexSnapshot>> {
        let input = IndexInput::from_parallel(document, texts, tables, summaries)?;
        self.build(input, embedder).await
    }

    /// Rank surrogates against the question and return the original
    /// elements they stand for, best first.
    pub async fn retrieve(
        &self,
        question: &str,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<RetrievedElement>> {
        let snapshot = self.snapshot().ok_or(Error::NotReady)?;
        if snapshot.is_empty() {
            return Ok(Vec::new());
        }

        let query = embedder.embed_query(question).await?;
        let hits = snapshot
            .search
            .search(&query, self.top_k, self.min_similarity)?;
        let results = snapshot.resolve(&hits)?;

        tracing::debug!(
            "Retrieved {} elements ({} tables) for query",
            results.len(),
            results.iter().filter(|r| r.element.is_table()).count()
        );
        Ok(results)
    }

    /// Record counts and readiness
    pub fn stats(&self) -> IndexStats {
        match self.snapshot() {
            Some(snapshot) => IndexStats {
                ready: true,
                search_records: snapshot.search.len(),
                payload_records: snapshot.payload.len(),
                text_records: snapshot.meta.text_records,
                table_records: snapshot.meta.table_records,
                document: Some(snapshot.meta.document.clone()),
                built_at: Some(snapshot.meta.built_at),
            },
            None => IndexStats {
                ready: false,
                search_records: 0,
                payload_records: 0,
                text_records: 0,
                table_records: 0,
                document: None,
                built_at: None,
            },
        }
    }
}
