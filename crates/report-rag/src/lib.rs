//! report-rag: question answering over a financial report
//!
//! Tables are summarized by a language model and the summaries are indexed
//! for search, while the original tables and text blocks are kept in a
//! separate payload store linked by identifier. Queries rank surrogates and
//! return the original elements, which ground the final answer.

pub mod config;
pub mod context;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::{Credentials, RagConfig};
pub use context::{AppContext, ProcessStage};
pub use error::{Error, Result};
pub use retrieval::{IndexInput, IndexSnapshot, RetrieverBinding};
pub use types::{
    Answer, Element, ElementKind, IndexStats, ProcessReport, RetrievedElement, SummarizedTable,
};
