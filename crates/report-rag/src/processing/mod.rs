//! Table summarization with bounded concurrency, timeouts, and retry

mod retry;
mod summarizer;

pub use retry::{with_timeout, RetryPolicy};
pub use summarizer::{SummaryProgress, TableSummarizer};
