//! Similarity search over surrogates

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A searchable surrogate and the identifier of the element it stands for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurrogateRecord {
    /// Link to the payload store
    pub id: Uuid,
    /// Text the embedding was computed from
    pub surrogate: String,
    /// Embedding of `surrogate`
    pub embedding: Vec<f32>,
}

/// A ranked search hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub id: Uuid,
    pub similarity: f32,
}

/// Brute-force cosine search over surrogate embeddings.
///
/// Records keep insertion order, which breaks ties between equal scores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchStore {
    dimensions: usize,
    records: Vec<SurrogateRecord>,
}

impl SearchStore {
    /// Create an empty store for `dimensions`-wide embeddings
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            records: Vec::new(),
        }
    }

    /// Embedding width
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Add a record
    pub fn insert(&mut self, record: SurrogateRecord) -> Result<()> {
        if record.embedding.len() != self.dimensions {
            return Err(Error::Validation(format!(
                "embedding for record {} has {} dimensions, store expects {}",
                record.id,
                record.embedding.len(),
                self.dimensions
            )));
        }
        self.records.push(record);
        Ok(())
    }

    /// Records in insertion order
    pub fn records(&self) -> &[SurrogateRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rank all records against a query embedding.
    ///
    /// Returns at most `top_k` hits, best first, dropping those below
    /// `min_similarity` when set.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        min_similarity: Option<f32>,
    ) -> Result<Vec<SearchHit>> {
        if self.records.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(Error::Validation(format!(
                "query embedding has {} dimensions, store expects {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut hits: Vec<SearchHit> = self
            .records
            .iter()
            .map(|record| SearchHit {
                id: record.id,
                similarity: cosine_similarity(query, &record.embedding),
            })
            .filter(|hit| min_similarity.map_or(true, |floor| hit.similarity >= floor))
            .collect();

        // Stable sort keeps insertion order for equal scores
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(top_k);

        Ok(hits)
    }
}

/// Cosine similarity; zero vectors score 0.0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
