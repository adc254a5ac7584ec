//! Request and response types for processing and querying

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::element::{Element, ElementKind};

/// An original element returned by retrieval, in rank order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedElement {
    /// The original, unabridged element
    pub element: Element,
    /// Cosine similarity between the question and the element's surrogate
    pub similarity: f32,
}

/// Grounded answer with the context it was generated from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Model answer
    pub answer: String,
    /// Context block sent to the model
    pub context: String,
    /// Retrieved elements in rank order
    pub sources: Vec<RetrievedElement>,
}

/// Process request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessRequest {
    /// Document to ingest (defaults to the configured document)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Outcome of processing a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessReport {
    /// Document that was processed
    pub document: String,
    /// Text blocks indexed
    pub text_elements: usize,
    /// Tables indexed
    pub table_elements: usize,
    /// Total records in the index
    pub records: usize,
    /// Build completion time
    pub built_at: DateTime<Utc>,
    /// Wall time for extraction, summarization, and indexing
    pub elapsed_ms: u64,
}

/// Query request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,
}

/// A source element as shown to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceElement {
    /// Text or table
    pub kind: ElementKind,
    /// Original content
    pub content: String,
    /// Table HTML, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Page number, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Similarity score (0.0-1.0 for normalized embeddings)
    pub similarity: f32,
}

impl From<&RetrievedElement> for SourceElement {
    fn from(retrieved: &RetrievedElement) -> Self {
        Self {
            kind: retrieved.element.kind,
            content: retrieved.element.content.clone(),
            html: retrieved.element.html.clone(),
            page_number: retrieved.element.page_number,
            similarity: retrieved.similarity,
        }
    }
}

/// Query response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// The generated answer
    pub answer: String,
    /// Ranked original elements the answer was grounded on
    pub sources: Vec<SourceElement>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl QueryResponse {
    /// Build from an answer
    pub fn from_answer(answer: &Answer, processing_time_ms: u64) -> Self {
        Self {
            answer: answer.answer.clone(),
            sources: answer.sources.iter().map(SourceElement::from).collect(),
            processing_time_ms,
        }
    }
}

/// Index status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Whether a build has completed
    pub ready: bool,
    /// Records in the search store
    pub search_records: usize,
    /// Records in the payload store
    pub payload_records: usize,
    /// Text records
    pub text_records: usize,
    /// Table records
    pub table_records: usize,
    /// Document the index was built from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    /// Build time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub built_at: Option<DateTime<Utc>>,
}

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A message in the session's conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message stamped now
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
