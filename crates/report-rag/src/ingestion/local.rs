//! Offline text extraction with pdf-extract

use async_trait::async_trait;
use std::path::Path;

use crate::config::ExtractorConfig;
use crate::error::{Error, Result};
use crate::types::{Element, Extraction};

use super::chunker::BlockChunker;
use super::ElementExtractor;

/// Local PDF extractor.
///
/// Has no table inference: every element it produces is a text block.
pub struct LocalPdfExtractor {
    chunker: BlockChunker,
}

impl LocalPdfExtractor {
    /// Create a new local extractor
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            chunker: BlockChunker::from_config(config),
        }
    }

    /// Turn extracted page texts into ordered text elements
    fn elements_from_pages(&self, pages: &[String]) -> Vec<Element> {
        let mut elements = Vec::new();
        let paginated = pages.len() > 1;

        for (index, page) in pages.iter().enumerate() {
            let page_number = paginated.then(|| index as u32 + 1);
            for block in self.chunker.chunk(page) {
                let position = elements.len();
                elements.push(Element::text(position, block).with_page(page_number));
            }
        }

        elements
    }
}

/// Extract text per page; pdf-extract separates pages with form feeds
fn extract_pages(source_name: &str, data: &[u8]) -> Result<Vec<String>> {
    let document = lopdf::Document::load_mem(data)
        .map_err(|e| Error::parse(source_name, format!("not a readable PDF: {}", e)))?;
    let page_count = document.get_pages().len();

    let text = pdf_extract::extract_text_from_mem(data)
        .map_err(|e| Error::parse(source_name, e.to_string()))?;

    let pages: Vec<String> = text.split('\u{c}').map(str::to_string).collect();
    tracing::debug!(
        "Extracted {} chars from {} pages ({} text segments)",
        text.len(),
        page_count,
        pages.len()
    );

    Ok(pages)
}

#[async_trait]
impl ElementExtractor for LocalPdfExtractor {
    async fn extract(&self, path: &Path) -> Result<Extraction> {
        let source_name = path.display().to_string();
        tracing::info!("Extracting text locally: {}", source_name);

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::parse(&source_name, format!("cannot read file: {}", e)))?;

        let name = source_name.clone();
        let pages = tokio::task::spawn_blocking(move || extract_pages(&name, &data))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

        let elements = self.elements_from_pages(&pages);
        if elements.is_empty() {
            tracing::warn!("No text found in {}", source_name);
        }

        Ok(Extraction::new(elements))
    }

    fn name(&self) -> &str {
        "local-pdf"
    }
}
