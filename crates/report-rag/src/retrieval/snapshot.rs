//! An immutable, fully built pair of stores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::types::{ElementKind, RetrievedElement};

use super::payload_store::PayloadStore;
use super::search_store::{SearchHit, SearchStore};

/// Build metadata stored with the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Collection name
    pub collection: String,
    /// Source document
    pub document: String,
    /// SHA-256 of the source document bytes, hex encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_sha256: Option<String>,
    pub built_at: DateTime<Utc>,
    pub text_records: usize,
    pub table_records: usize,
    /// Embedding provider the surrogates were embedded with
    pub embedder: String,
    pub dimensions: usize,
}

/// Search store and payload store from a single build.
///
/// Never mutated once built; a rebuild produces a new snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub meta: SnapshotMeta,
    pub(crate) search: SearchStore,
    pub(crate) payload: PayloadStore,
}

impl IndexSnapshot {
    pub(crate) fn new(meta: SnapshotMeta, search: SearchStore, payload: PayloadStore) -> Self {
        Self {
            meta,
            search,
            payload,
        }
    }

    /// Search side
    pub fn search_store(&self) -> &SearchStore {
        &self.search
    }

    /// Payload side
    pub fn payload_store(&self) -> &PayloadStore {
        &self.payload
    }

    /// Total indexed records
    pub fn len(&self) -> usize {
        self.search.len()
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty()
    }

    /// Check that both stores hold exactly the same identifiers, once each,
    /// and that the metadata agrees with their contents.
    pub fn verify(&self) -> Result<()> {
        if self.search.len() != self.payload.len() {
            return Err(Error::store(format!(
                "search store has {} records but payload store has {}",
                self.search.len(),
                self.payload.len()
            )));
        }

        let mut seen = HashSet::with_capacity(self.search.len());
        for record in self.search.records() {
            if !seen.insert(record.id) {
                return Err(Error::store(format!(
                    "identifier {} appears twice in the search store",
                    record.id
                )));
            }
            if !self.payload.contains(&record.id) {
                return Err(Error::store(format!(
                    "identifier {} has no payload",
                    record.id
                )));
            }
        }

        let mut texts = 0;
        let mut tables = 0;
        for (id, stored) in self.payload.iter() {
            if stored.kind != stored.element.kind {
                return Err(Error::store(format!(
                    "payload {} is tagged {} but holds a {} element",
                    id, stored.kind, stored.element.kind
                )));
            }
            match stored.kind {
                ElementKind::Text => texts += 1,
                ElementKind::Table => tables += 1,
            }
        }

        if texts != self.meta.text_records || tables != self.meta.table_records {
            return Err(Error::store(format!(
                "metadata records {} text / {} table, stores hold {} / {}",
                self.meta.text_records, self.meta.table_records, texts, tables
            )));
        }
        if self.search.dimensions() != self.meta.dimensions {
            return Err(Error::store(format!(
                "metadata records {} dimensions, search store uses {}",
                self.meta.dimensions,
                self.search.dimensions()
            )));
        }

        Ok(())
    }

    /// Resolve ranked hits to original elements.
    ///
    /// A hit without a payload is a consistency violation and fails the
    /// whole lookup.
    pub fn resolve(&self, hits: &[SearchHit]) -> Result<Vec<RetrievedElement>> {
        hits.iter()
            .map(|hit| {
                let stored = self
                    .payload
                    .get(&hit.id)
                    .ok_or(Error::LookupFailure { id: hit.id })?;
                Ok(RetrievedElement {
                    element: stored.element.clone(),
                    similarity: hit.similarity,
                })
            })
            .collect()
    }
}
