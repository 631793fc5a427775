//! Summarization stage.

use std::sync::Arc;
use std::time::Duration;

use super::llm::{LlmClient, LlmError};
use super::stage::{StageExecutor, StageOutcome};

/// Stands in for the summary when summarization times out or fails.
pub const SUMMARY_PLACEHOLDER: &str = "Summarization failed or timed out.";

/// Returned without calling the model for very short inputs.
pub const TOO_SHORT_SUMMARY: &str = "Text too short to summarize.";

/// Inputs shorter than this many characters are not worth a model call.
pub const MIN_SUMMARY_INPUT_CHARS: usize = 50;

const SUMMARY_SYSTEM_PROMPT: &str = "\
You summarize scanned business documents. Reply with the summary only, \
in two to four plain sentences, without preamble.";

pub trait Summarizer: Send + Sync {
    fn summarize(&self, text: &str) -> Result<String, LlmError>;
}

/// Summarizer backed by an Ollama text model.
pub struct LlmSummarizer {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl LlmSummarizer {
    pub fn new(client: Arc<dyn LlmClient>, model: String) -> Self {
        Self { client, model }
    }
}

impl Summarizer for LlmSummarizer {
    fn summarize(&self, text: &str) -> Result<String, LlmError> {
        if text.chars().count() < MIN_SUMMARY_INPUT_CHARS {
            return Ok(TOO_SHORT_SUMMARY.to_string());
        }
        let prompt = format!("Summarize the following document text.\n\nDocument Text:\n{text}");
        let summary = self
            .client
            .generate(&self.model, &prompt, Some(SUMMARY_SYSTEM_PROMPT))?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(LlmError::ResponseParsing("empty summary".into()));
        }
        Ok(summary.to_string())
    }
}

/// Runs the summarizer under the LLM deadline.
pub struct SummarizationAdapter {
    summarizer: Arc<dyn Summarizer>,
    executor: StageExecutor,
    timeout: Duration,
}

impl SummarizationAdapter {
    pub fn new(summarizer: Arc<dyn Summarizer>, executor: StageExecutor, timeout: Duration) -> Self {
        Self {
            summarizer,
            executor,
            timeout,
        }
    }

    pub fn summarize(&self, text: &str) -> StageOutcome<String> {
        let summarizer = Arc::clone(&self.summarizer);
        let text = text.to_string();
        self.executor
            .run("summarize", self.timeout, move || summarizer.summarize(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::MockLlmClient;

    const LONG_TEXT: &str = "The quarterly budget review covers allocation of funds across \
        all departments for the coming fiscal year.";

    #[test]
    fn short_text_skips_model() {
        let client = Arc::new(MockLlmClient::new("should not be used"));
        let summarizer = LlmSummarizer::new(client.clone(), "mistral".into());
        assert_eq!(summarizer.summarize("tiny memo").unwrap(), TOO_SHORT_SUMMARY);
        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn long_text_uses_model_answer() {
        let client = Arc::new(MockLlmClient::new("  A budget review.\n"));
        let summarizer = LlmSummarizer::new(client.clone(), "mistral".into());
        assert_eq!(summarizer.summarize(LONG_TEXT).unwrap(), "A budget review.");
        assert_eq!(client.call_count(), 1);
    }

    #[test]
    fn blank_answer_is_error() {
        let summarizer = LlmSummarizer::new(Arc::new(MockLlmClient::new("   ")), "mistral".into());
        assert!(summarizer.summarize(LONG_TEXT).is_err());
    }

    #[test]
    fn adapter_reports_timeout() {
        let client = Arc::new(MockLlmClient::new("late").with_delay(Duration::from_millis(500)));
        let adapter = SummarizationAdapter::new(
            Arc::new(LlmSummarizer::new(client, "mistral".into())),
            StageExecutor::new(),
            Duration::from_millis(30),
        );
        assert_eq!(adapter.summarize(LONG_TEXT), StageOutcome::TimedOut);
    }

    #[test]
    fn adapter_reports_failure() {
        let adapter = SummarizationAdapter::new(
            Arc::new(LlmSummarizer::new(
                Arc::new(MockLlmClient::failing("down")),
                "mistral".into(),
            )),
            StageExecutor::new(),
            Duration::from_secs(5),
        );
        assert!(matches!(adapter.summarize(LONG_TEXT), StageOutcome::Failed(_)));
    }
}
