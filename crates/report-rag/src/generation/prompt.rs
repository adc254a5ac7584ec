//! Prompt templates for table summaries and grounded answers

use crate::types::{Element, RetrievedElement};

/// Prompt builder for summarization and answering
pub struct PromptBuilder;

impl PromptBuilder {
    /// Prompt asking for a search-friendly summary of one table
    pub fn table_summary(table: &Element) -> String {
        format!(
            "You are a financial analyst. Explain the following table in clear sentences. \
             Highlight the key numbers, trends, and column headers. \
             Do not lose important data points. \n\nTable Data: {}",
            table
        )
    }

    /// Join retrieved element contents in rank order
    pub fn build_context(results: &[RetrievedElement]) -> String {
        results
            .iter()
            .map(|r| r.element.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Prompt constraining the answer to the supplied context
    pub fn grounded_answer(context: &str, question: &str) -> String {
        format!(
            "Answer the question based ONLY on the following context. \
             If the context contains tables, use the data in the tables.\n\n\
             Context:\n{}\n\n\
             Question: {}",
            context, question
        )
    }
}
