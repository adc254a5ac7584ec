//! Element extraction: partitions a report into text and table elements

mod chunker;
mod local;
mod unstructured;

pub use chunker::BlockChunker;
pub use local::LocalPdfExtractor;
pub use unstructured::UnstructuredExtractor;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::config::{Credentials, ExtractorConfig, ExtractorKind};
use crate::error::Result;
use crate::types::Extraction;

/// Partitions a source document into an ordered sequence of typed elements
#[async_trait]
pub trait ElementExtractor: Send + Sync {
    /// Extract elements in document order.
    ///
    /// Fails with `Error::ParseFailure` when the document cannot be analyzed.
    async fn extract(&self, path: &Path) -> Result<Extraction>;

    /// Get extractor name for logging
    fn name(&self) -> &str;
}

/// Tries a primary extractor and falls back to a second one on failure
pub struct FallbackExtractor {
    primary: Arc<dyn ElementExtractor>,
    fallback: Arc<dyn ElementExtractor>,
}

impl FallbackExtractor {
    /// Create a fallback chain
    pub fn new(primary: Arc<dyn ElementExtractor>, fallback: Arc<dyn ElementExtractor>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl ElementExtractor for FallbackExtractor {
    async fn extract(&self, path: &Path) -> Result<Extraction> {
        match self.primary.extract(path).await {
            Ok(extraction) => Ok(extraction),
            Err(e) => {
                tracing::warn!(
                    "{} extraction failed ({}), falling back to {}",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                self.fallback.extract(path).await
            }
        }
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

/// Build the configured extractor
pub fn from_config(
    config: &ExtractorConfig,
    credentials: &Credentials,
) -> Result<Arc<dyn ElementExtractor>> {
    let local: Arc<dyn ElementExtractor> = Arc::new(LocalPdfExtractor::new(config));

    match config.provider {
        ExtractorKind::Local => Ok(local),
        ExtractorKind::Unstructured => {
            let remote: Arc<dyn ElementExtractor> = Arc::new(UnstructuredExtractor::new(
                config.clone(),
                credentials.unstructured_api_key.clone(),
            )?);
            if config.fallback_to_local {
                Ok(Arc::new(FallbackExtractor::new(remote, local)))
            } else {
                Ok(remote)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::Element;

    struct Failing;

    #[async_trait]
    impl ElementExtractor for Failing {
        async fn extract(&self, path: &Path) -> Result<Extraction> {
            Err(Error::parse(path.display().to_string(), "service unavailable"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct Fixed;

    #[async_trait]
    impl ElementExtractor for Fixed {
        async fn extract(&self, _path: &Path) -> Result<Extraction> {
            Ok(Extraction::new(vec![Element::text(0, "fallback text")]))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_fallback_used_on_failure() {
        let chain = FallbackExtractor::new(Arc::new(Failing), Arc::new(Fixed));
        let extraction = chain.extract(Path::new("report.pdf")).await.unwrap();
        assert_eq!(extraction.elements.len(), 1);
        assert_eq!(extraction.elements[0].content, "fallback text");
    }

    #[tokio::test]
    async fn test_fallback_failure_propagates() {
        let chain = FallbackExtractor::new(Arc::new(Failing), Arc::new(Failing));
        let err = chain.extract(Path::new("report.pdf")).await.unwrap_err();
        assert!(matches!(err, Error::ParseFailure { .. }));
    }
}
