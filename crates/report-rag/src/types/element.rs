//! Document elements produced by extraction

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of an extracted element, assigned once at extraction time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Block of running text
    Text,
    /// Table
    Table,
}

impl ElementKind {
    /// Tag stored alongside the payload
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Table => "table",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of document content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Text or table
    pub kind: ElementKind,
    /// Raw content (table text for tables)
    pub content: String,
    /// Structured HTML rendering of a table, when the extractor inferred one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Position in extraction order
    pub position: usize,
    /// Page the element starts on (1-indexed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

impl Element {
    /// Create a text element
    pub fn text(position: usize, content: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Text,
            content: content.into(),
            html: None,
            position,
            page_number: None,
        }
    }

    /// Create a table element
    pub fn table(position: usize, content: impl Into<String>, html: Option<String>) -> Self {
        Self {
            kind: ElementKind::Table,
            content: content.into(),
            html,
            position,
            page_number: None,
        }
    }

    /// Attach a page number
    pub fn with_page(mut self, page_number: Option<u32>) -> Self {
        self.page_number = page_number;
        self
    }

    /// Check if this is a table
    pub fn is_table(&self) -> bool {
        self.kind == ElementKind::Table
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// A table paired with its summary.
///
/// Built right after summarization so a summary can never drift away from
/// the table it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizedTable {
    /// The original table
    pub table: Element,
    /// Natural-language summary used as the search surrogate
    pub summary: String,
}

/// Ordered extractor output
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Elements in document order
    pub elements: Vec<Element>,
}

impl Extraction {
    /// Wrap extracted elements
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    /// Partition into (text elements, table elements), each in document order
    pub fn split(self) -> (Vec<Element>, Vec<Element>) {
        let (tables, texts): (Vec<_>, Vec<_>) =
            self.elements.into_iter().partition(Element::is_table);
        tracing::info!(
            "Extraction done: {} text blocks, {} tables",
            texts.len(),
            tables.len()
        );
        (texts, tables)
    }
}
