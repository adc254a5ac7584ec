//! Surrogate generation for table elements

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::SummarizationConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::LlmProvider;
use crate::types::{Element, SummarizedTable};

use super::retry::{with_timeout, RetryPolicy};

/// Progress of a summarization run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryProgress {
    /// Tables summarized so far
    pub completed: usize,
    /// Tables in the run
    pub total: usize,
}

/// Produces one summary per table using the configured language model
pub struct TableSummarizer {
    llm: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    timeout: Duration,
    concurrency: usize,
}

impl TableSummarizer {
    /// Create a summarizer
    pub fn new(llm: Arc<dyn LlmProvider>, config: &SummarizationConfig, retry: RetryPolicy) -> Self {
        Self {
            llm,
            retry,
            timeout: Duration::from_secs(config.timeout_secs),
            concurrency: config.concurrency(),
        }
    }

    /// Summarize one table, with timeout and retry
    pub async fn summarize(&self, table: &Element) -> Result<String> {
        if !table.is_table() {
            return Err(Error::Validation(format!(
                "element at position {} is {}, only tables are summarized",
                table.position, table.kind
            )));
        }

        let prompt = PromptBuilder::table_summary(table);
        let summary = self
            .retry
            .run("table summary", || {
                with_timeout("table summary", self.timeout, self.llm.generate(&prompt))
            })
            .await?;

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(Error::generation(format!(
                "empty summary for table at position {}",
                table.position
            )));
        }
        Ok(summary.to_string())
    }

    /// Summarize all tables, pairing each with its summary in input order.
    ///
    /// Up to `concurrency` calls run at once. Cancellation is checked before
    /// each call starts and aborts calls in flight.
    pub async fn summarize_tables(
        &self,
        tables: Vec<Element>,
        cancel: &CancellationToken,
        progress: &(dyn Fn(SummaryProgress) + Send + Sync),
    ) -> Result<Vec<SummarizedTable>> {
        let total = tables.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        tracing::info!(
            "Summarizing {} tables with {} ({} concurrent)",
            total,
            self.llm.model(),
            self.concurrency
        );

        let completed = AtomicUsize::new(0);
        let completed = &completed;

        let pairs = stream::iter(tables)
            .map(|table| async move {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let summary = tokio::select! {
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    result = self.summarize(&table) => result?,
                };
                tracing::debug!(
                    "Summarized table {} ({} -> {} chars)",
                    table.position,
                    table.content.len(),
                    summary.len()
                );

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                progress(SummaryProgress {
                    completed: done,
                    total,
                });
                Ok::<_, Error>(SummarizedTable { table, summary })
            })
            .buffered(self.concurrency)
            .try_collect::<Vec<_>>()
            .await?;

        tracing::info!("Summarized {} tables", pairs.len());
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicU32;

    /// Echoes the table body back, sleeping longer for earlier tables
    struct EchoLlm {
        calls: AtomicU32,
        fail_first: bool,
    }

    impl EchoLlm {
        fn new(fail_first: bool) -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail_first,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for EchoLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(Error::transient("429 quota"));
            }
            let body = prompt.rsplit("Table Data: ").next().unwrap_or_default();
            let delay = 40u64.saturating_sub(body.len() as u64 * 5);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(format!("Summary of {}", body))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }
    }

    struct BlankLlm;

    #[async_trait]
    impl LlmProvider for BlankLlm {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok("   ".to_string())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "blank"
        }

        fn model(&self) -> &str {
            "blank-1"
        }
    }

    fn summarizer(llm: Arc<dyn LlmProvider>, concurrency: usize) -> TableSummarizer {
        let config = SummarizationConfig {
            concurrency: Some(concurrency),
            timeout_secs: 5,
        };
        TableSummarizer::new(
            llm,
            &config,
            RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(2)),
        )
    }

    fn tables(n: usize) -> Vec<Element> {
        (0..n)
            .map(|i| Element::table(i, "t".repeat(i + 1), None))
            .collect()
    }

    #[tokio::test]
    async fn test_order_is_preserved_under_concurrency() {
        let summarizer = summarizer(Arc::new(EchoLlm::new(false)), 4);
        let seen = Mutex::new(Vec::new());

        let pairs = summarizer
            .summarize_tables(tables(6), &CancellationToken::new(), &|p: SummaryProgress| seen.lock().push(p))
            .await
            .unwrap();

        assert_eq!(pairs.len(), 6);
        for (i, pair) in pairs.iter().enumerate() {
            assert_eq!(pair.table.position, i);
            assert_eq!(pair.summary, format!("Summary of {}", pair.table.content));
        }

        let seen = seen.lock();
        assert_eq!(seen.len(), 6);
        assert_eq!(seen.last().unwrap().completed, 6);
        assert!(seen.iter().all(|p| p.total == 6));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let llm = Arc::new(EchoLlm::new(true));
        let summarizer = summarizer(llm.clone(), 1);

        let pairs = summarizer
            .summarize_tables(tables(2), &CancellationToken::new(), &|_: SummaryProgress| {})
            .await
            .unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let summarizer = summarizer(Arc::new(EchoLlm::new(false)), 2);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = summarizer
            .summarize_tables(tables(3), &cancel, &|_: SummaryProgress| {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_empty_summary_is_an_error() {
        let summarizer = summarizer(Arc::new(BlankLlm), 1);
        let err = summarizer.summarize(&Element::table(0, "T1", None)).await.unwrap_err();
        assert!(matches!(err, Error::Generation { retryable: false, .. }));
    }

    #[tokio::test]
    async fn test_text_elements_are_rejected() {
        let summarizer = summarizer(Arc::new(BlankLlm), 1);
        let err = summarizer.summarize(&Element::text(0, "prose")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_no_tables() {
        let summarizer = summarizer(Arc::new(BlankLlm), 1);
        let pairs = summarizer
            .summarize_tables(Vec::new(), &CancellationToken::new(), &|_: SummaryProgress| {})
            .await
            .unwrap();
        assert!(pairs.is_empty());
    }
}
