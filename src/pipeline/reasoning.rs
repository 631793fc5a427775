//! Second opinion from a text LLM for the labels the image classifier confuses most.
//!
//! The model sees the OCR text only and must answer with a JSON object naming one of
//! the sensitive labels. Anything else counts as no opinion.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use super::extraction::truncate_chars;
use super::llm::{LlmClient, LlmError};
use super::stage::{StageExecutor, StageOutcome};
use crate::models::DocumentLabel;

/// Confidence assumed when the model leaves it out.
pub const DEFAULT_REASONING_CONFIDENCE: f32 = 0.90;

#[derive(Error, Debug)]
pub enum ReasoningError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Malformed reasoning response: {0}")]
    MalformedResponse(String),

    #[error("Label outside the reasoning set: {0}")]
    UnsupportedLabel(String),
}

/// Parsed answer of the reasoning service.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningVerdict {
    pub label: DocumentLabel,
    pub confidence: f32,
    pub reasoning: String,
}

pub trait TextReasoner: Send + Sync {
    fn reason_about_text(&self, text: &str) -> Result<ReasoningVerdict, ReasoningError>;
}

/// Reasoner that prompts an Ollama model and parses its JSON answer.
pub struct OllamaReasoner {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl OllamaReasoner {
    pub fn new(client: Arc<dyn LlmClient>, model: String) -> Self {
        Self { client, model }
    }
}

impl TextReasoner for OllamaReasoner {
    fn reason_about_text(&self, text: &str) -> Result<ReasoningVerdict, ReasoningError> {
        let prompt = build_reasoning_prompt(text);
        let raw = self.client.generate(&self.model, &prompt, None)?;
        parse_verdict(&raw)
    }
}

fn build_reasoning_prompt(text: &str) -> String {
    format!(
        "You are a document classification expert. Your task is to classify the following \
OCR-extracted document text into one of the following types:

- Resume: Contains sections like 'Summary', 'Work Experience', 'Education', 'Skills', and personal contact info.
- Memo: Internal communication with 'To:', 'From:', 'Subject:', and a date.
- Letter: Formal communication with greetings like 'Dear', and closing like 'Sincerely'.
- Specification: Technical document listing product specs, parameters, or test instructions.

Return only a JSON object with:
- \"document_type\": one of the four labels above
- \"confidence\": a float between 0 and 1
- \"reasoning\": a short explanation of why you chose this label

Document Text:
{text}
"
    )
}

#[derive(Deserialize)]
struct RawVerdict {
    document_type: String,
    #[serde(default)]
    confidence: Option<serde_json::Value>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parse the model's answer. Tolerates Markdown fences and prose around the object.
pub fn parse_verdict(raw: &str) -> Result<ReasoningVerdict, ReasoningError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| ReasoningError::MalformedResponse("no JSON object found".into()))?;
    let parsed: RawVerdict = serde_json::from_str(json)
        .map_err(|e| ReasoningError::MalformedResponse(e.to_string()))?;

    let label = DocumentLabel::parse_loose(&parsed.document_type)
        .filter(DocumentLabel::is_sensitive)
        .ok_or_else(|| ReasoningError::UnsupportedLabel(parsed.document_type.clone()))?;

    let confidence = match parsed.confidence {
        None | Some(serde_json::Value::Null) => DEFAULT_REASONING_CONFIDENCE,
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0) as f32,
        Some(serde_json::Value::String(s)) => s.trim().parse::<f32>().map_err(|_| {
            ReasoningError::MalformedResponse(format!("confidence is not a number: {s}"))
        })?,
        Some(other) => {
            return Err(ReasoningError::MalformedResponse(format!(
                "confidence is not a number: {other}"
            )))
        }
    };
    let confidence = if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    };

    Ok(ReasoningVerdict {
        label,
        confidence,
        reasoning: parsed.reasoning.unwrap_or_default(),
    })
}

/// Slice from the first `{` to the last `}`.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Runs the reasoner under the LLM deadline. Never raises: every problem is logged
/// and yields `None`.
pub struct ReasoningOverrideAdapter {
    reasoner: Arc<dyn TextReasoner>,
    executor: StageExecutor,
    timeout: Duration,
    text_limit: usize,
}

impl ReasoningOverrideAdapter {
    pub fn new(
        reasoner: Arc<dyn TextReasoner>,
        executor: StageExecutor,
        timeout: Duration,
        text_limit: usize,
    ) -> Self {
        Self {
            reasoner,
            executor,
            timeout,
            text_limit,
        }
    }

    pub fn classify(&self, text: &str) -> Option<ReasoningVerdict> {
        let reasoner = Arc::clone(&self.reasoner);
        let snippet = truncate_chars(text, self.text_limit).to_string();

        match self.executor.run("reasoning", self.timeout, move || {
            reasoner.reason_about_text(&snippet)
        }) {
            StageOutcome::Success(verdict) => {
                tracing::debug!(
                    label = %verdict.label,
                    confidence = verdict.confidence,
                    reasoning = %verdict.reasoning,
                    "Reasoning verdict"
                );
                Some(verdict)
            }
            StageOutcome::TimedOut => {
                tracing::warn!("Reasoning service timed out, no override candidate");
                None
            }
            StageOutcome::Failed(reason) => {
                tracing::warn!(reason = %reason, "Reasoning unavailable, no override candidate");
                None
            }
        }
    }
}

/// Scripted reasoner for tests. Counts calls and remembers the last text it saw.
pub struct MockReasoner {
    answer: Result<ReasoningVerdict, String>,
    calls: AtomicUsize,
    last_text: Mutex<Option<String>>,
}

impl MockReasoner {
    pub fn answering(label: DocumentLabel, confidence: f32) -> Self {
        Self {
            answer: Ok(ReasoningVerdict {
                label,
                confidence,
                reasoning: "mock".into(),
            }),
            calls: Default::default(),
            last_text: Default::default(),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            answer: Err(reason.to_string()),
            calls: Default::default(),
            last_text: Default::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_text(&self) -> Option<String> {
        self.last_text.lock().ok().and_then(|t| t.clone())
    }
}

impl TextReasoner for MockReasoner {
    fn reason_about_text(&self, text: &str) -> Result<ReasoningVerdict, ReasoningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_text.lock() {
            *last = Some(text.to_string());
        }
        self.answer
            .clone()
            .map_err(|reason| ReasoningError::Llm(LlmError::OllamaConnection(reason)))
    }
}
