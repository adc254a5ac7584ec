//! Table-aware extraction via the Unstructured partition API

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::config::ExtractorConfig;
use crate::error::{Error, Result};
use crate::types::{Element, ElementKind, Extraction};

use super::ElementExtractor;

/// Unstructured.io partition client
pub struct UnstructuredExtractor {
    client: Client,
    config: ExtractorConfig,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnstructuredElement {
    #[serde(rename = "type")]
    element_type: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    metadata: Option<UnstructuredMetadata>,
}

#[derive(Debug, Deserialize)]
struct UnstructuredMetadata {
    page_number: Option<u32>,
    text_as_html: Option<String>,
}

impl UnstructuredExtractor {
    /// Create a new partition client
    pub fn new(config: ExtractorConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Build the multipart form carrying the document and partition options
    fn form(&self, filename: String, data: Vec<u8>) -> reqwest::multipart::Form {
        let config = &self.config;
        reqwest::multipart::Form::new()
            .part(
                "files",
                reqwest::multipart::Part::bytes(data).file_name(filename),
            )
            .text("strategy", config.strategy.clone())
            .text(
                "pdf_infer_table_structure",
                config.infer_table_structure.to_string(),
            )
            .text("chunking_strategy", config.chunking_strategy.clone())
            .text("max_characters", config.max_characters.to_string())
            .text("new_after_n_chars", config.new_after_n_chars.to_string())
            .text(
                "combine_under_n_chars",
                config.combine_text_under_n_chars.to_string(),
            )
    }
}

/// Map a partition element type to an element kind.
///
/// By-title chunking yields `CompositeElement` for text and `Table` /
/// `TableChunk` for tables; anything else is not indexed.
fn classify(element_type: &str) -> Option<ElementKind> {
    match element_type {
        "Table" | "TableChunk" => Some(ElementKind::Table),
        "CompositeElement" => Some(ElementKind::Text),
        _ => None,
    }
}

/// Convert partition output to ordered elements
fn elements_from_response(items: Vec<UnstructuredElement>) -> Vec<Element> {
    let mut elements = Vec::new();
    let mut dropped = 0usize;

    for item in items {
        let Some(kind) = classify(&item.element_type) else {
            dropped += 1;
            continue;
        };
        let (page_number, html) = item
            .metadata
            .map(|m| (m.page_number, m.text_as_html))
            .unwrap_or((None, None));

        let position = elements.len();
        let element = match kind {
            ElementKind::Table => Element::table(position, item.text, html),
            ElementKind::Text => Element::text(position, item.text),
        };
        elements.push(element.with_page(page_number));
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} elements of unindexed types", dropped);
    }
    elements
}

#[async_trait]
impl ElementExtractor for UnstructuredExtractor {
    async fn extract(&self, path: &Path) -> Result<Extraction> {
        let source_name = path.display().to_string();
        tracing::info!("Analyzing PDF structure: {}", source_name);

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::parse(&source_name, format!("cannot read file: {}", e)))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());

        let mut request = self
            .client
            .post(&self.config.unstructured_url)
            .header("accept", "application/json")
            .multipart(self.form(filename, data));

        if let Some(ref api_key) = self.api_key {
            request = request.header("unstructured-api-key", api_key);
        }

        let response = request.send().await.map_err(|e| {
            Error::parse(&source_name, format!("partition request failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::parse(
                &source_name,
                format!("partition API error: {} - {}", status, body),
            ));
        }

        let items: Vec<UnstructuredElement> = response.json().await.map_err(|e| {
            Error::parse(&source_name, format!("invalid partition response: {}", e))
        })?;

        Ok(Extraction::new(elements_from_response(items)))
    }

    fn name(&self) -> &str {
        "unstructured"
    }
}
