//! Core types for the report pipeline

pub mod element;
pub mod response;

pub use element::{Element, ElementKind, Extraction, SummarizedTable};
pub use response::{
    Answer, ChatMessage, ChatRole, IndexStats, ProcessReport, ProcessRequest, QueryRequest,
    QueryResponse, RetrievedElement, SourceElement,
};
