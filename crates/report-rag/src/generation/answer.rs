//! Grounded answering over retrieved elements

use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::Result;
use crate::processing::{with_timeout, RetryPolicy};
use crate::providers::LlmProvider;
use crate::types::{Answer, RetrievedElement};

use super::prompt::PromptBuilder;

/// Asks the language model to answer from the supplied context only
pub struct AnsweringStage {
    llm: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl AnsweringStage {
    pub fn new(llm: Arc<dyn LlmProvider>, config: &LlmConfig, retry: RetryPolicy) -> Self {
        Self {
            llm,
            retry,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Answer `question` from `elements`, which must be in rank order.
    ///
    /// The model is called even when nothing was retrieved; the prompt then
    /// carries an empty context and the model is left to say it cannot
    /// answer.
    pub async fn answer(&self, question: &str, elements: Vec<RetrievedElement>) -> Result<Answer> {
        let context = PromptBuilder::build_context(&elements);
        let prompt = PromptBuilder::grounded_answer(&context, question);

        tracing::debug!(
            "Answering with {} context elements ({} chars)",
            elements.len(),
            context.len()
        );

        let answer = self
            .retry
            .run("answer", || {
                with_timeout("answer", self.timeout, self.llm.generate(&prompt))
            })
            .await?;

        Ok(Answer {
            answer: answer.trim().to_string(),
            context,
            sources: elements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::Element;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingLlm {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            Ok(" GDP grew 3% in 2023. \n".to_string())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "recording-1"
        }
    }

    struct DownLlm;

    #[async_trait]
    impl LlmProvider for DownLlm {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(Error::generation("invalid API key"))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "down"
        }

        fn model(&self) -> &str {
            "down-1"
        }
    }

    #[tokio::test]
    async fn test_context_follows_rank_order() {
        let llm = Arc::new(RecordingLlm::default());
        let stage = AnsweringStage::new(llm.clone(), &LlmConfig::default(), RetryPolicy::none());

        let elements = vec![
            RetrievedElement {
                element: Element::table(1, "Year | GDP growth\n2023 | 3%", None),
                similarity: 0.8,
            },
            RetrievedElement {
                element: Element::text(0, "Qatar GDP grew 3%."),
                similarity: 0.5,
            },
        ];
        let answer = stage.answer("What was GDP growth?", elements).await.unwrap();

        assert_eq!(answer.answer, "GDP grew 3% in 2023.");
        assert_eq!(answer.context, "Year | GDP growth\n2023 | 3%\n\nQatar GDP grew 3%.");
        assert_eq!(answer.sources.len(), 2);

        let prompts = llm.prompts.lock();
        assert!(prompts[0].contains(&answer.context));
        assert!(prompts[0].ends_with("Question: What was GDP growth?"));
    }

    #[tokio::test]
    async fn test_empty_context_still_asks_the_model() {
        let llm = Arc::new(RecordingLlm::default());
        let stage = AnsweringStage::new(llm.clone(), &LlmConfig::default(), RetryPolicy::none());

        let answer = stage.answer("Anything?", Vec::new()).await.unwrap();
        assert!(answer.sources.is_empty());
        assert_eq!(llm.prompts.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let stage = AnsweringStage::new(Arc::new(DownLlm), &LlmConfig::default(), RetryPolicy::none());
        let err = stage.answer("GDP?", Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::Generation { .. }));
    }
}
