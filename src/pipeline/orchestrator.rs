//! Document classification orchestrator.
//!
//! Runs one request through the stages in order:
//! classify → extract + normalize → summarize → resolve overrides → (optional) store.
//!
//! Only the base classifier can fail a request. Extraction and summarization fall
//! back to placeholder text, reasoning to "no opinion", storage to "not persisted".

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use super::classifier::{load_classifier, BaseClassifierAdapter};
use super::extraction::{
    normalize_text, OcrEngine, OllamaVisionOcr, TesseractCli, TextExtractionAdapter,
    EXTRACTION_PLACEHOLDER,
};
use super::heuristic::HeuristicDetector;
use super::llm::{LlmClient, LlmError, OllamaClient};
use super::reasoning::{OllamaReasoner, ReasoningOverrideAdapter};
use super::resolver::{OverrideResolver, Resolution};
use super::stage::{StageExecutor, StageOutcome};
use super::summarize::{LlmSummarizer, SummarizationAdapter, SUMMARY_PLACEHOLDER};
use super::PipelineError;
use crate::config::{OcrBackend, Settings};
use crate::db::{HistoryEntry, ResultStore};
use crate::models::{format_confidence, ClassificationResult, LabelConfidence};

/// One uploaded document, as the HTTP layer hands it over.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub filename: String,
    pub bytes: Arc<[u8]>,
    pub owner_id: String,
    /// Store the result in the history database.
    pub save: bool,
    pub content_sha256: Option<String>,
}

/// Everything the stages produced for one document, before storage.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub base: LabelConfidence,
    pub extracted_text: String,
    pub summary: String,
    pub resolution: Resolution,
}

impl PipelineRun {
    pub fn into_result(self, persisted_id: Option<Uuid>) -> ClassificationResult {
        ClassificationResult {
            label: self.resolution.label,
            confidence: format_confidence(self.resolution.confidence),
            extracted_text: self.extracted_text,
            summary: self.summary,
            override_reason: self.resolution.reason,
            disagreement: self.resolution.disagreement,
            persisted_id,
        }
    }

    fn history_entry(&self, upload: &DocumentUpload) -> HistoryEntry {
        HistoryEntry {
            filename: upload.filename.clone(),
            label: self.resolution.label,
            confidence: self.resolution.confidence,
            override_reason: self.resolution.reason,
            disagreement: self.resolution.disagreement,
            summary: self.summary.clone(),
            raw_text: self.extracted_text.clone(),
            content_sha256: upload.content_sha256.clone(),
        }
    }
}

/// Sequences the pipeline stages for one document at a time.
///
/// Shared behind an `Arc` for the process lifetime; every field is read-only.
pub struct PipelineOrchestrator {
    classifier: BaseClassifierAdapter,
    extraction: TextExtractionAdapter,
    summarization: SummarizationAdapter,
    resolver: OverrideResolver,
    executor: StageExecutor,
    store: Option<Arc<dyn ResultStore>>,
}

impl PipelineOrchestrator {
    /// `executor` should be the same executor the adapters were built with, so
    /// `stage_workers_in_flight` sees all of them.
    pub fn new(
        classifier: BaseClassifierAdapter,
        extraction: TextExtractionAdapter,
        summarization: SummarizationAdapter,
        resolver: OverrideResolver,
        executor: StageExecutor,
    ) -> Self {
        Self {
            classifier,
            extraction,
            summarization,
            resolver,
            executor,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Wire the production stages from settings. Loads the classifier; a load failure
    /// is kept and reported per request, not returned here.
    ///
    /// Builds blocking HTTP clients: call it before entering the async runtime.
    pub fn from_settings(settings: &Settings) -> Result<Self, LlmError> {
        let executor = StageExecutor::new();

        let model_path = settings.resolved_model_path();
        let classifier = BaseClassifierAdapter::from_load(load_classifier(&model_path));

        // The stage deadline is the real bound; the HTTP timeout only stops runaway workers.
        let http_timeout = settings.llm_timeout_secs.max(settings.ocr_timeout_secs) * 3;
        let ollama = Arc::new(OllamaClient::new(&settings.ollama_url, http_timeout)?);
        probe_model(ollama.as_ref(), &settings.llm_model);

        let ocr: Arc<dyn OcrEngine> = match settings.ocr_backend {
            OcrBackend::Tesseract => Arc::new(
                TesseractCli::new(settings.tesseract_bin.clone())
                    .with_languages(&settings.tesseract_lang),
            ),
            OcrBackend::Vision => Arc::new(OllamaVisionOcr::new(
                ollama.clone(),
                settings.vision_model.clone(),
            )),
        };
        let llm: Arc<dyn LlmClient> = ollama;

        let extraction = TextExtractionAdapter::new(ocr, executor.clone(), settings.ocr_timeout());
        let summarization = SummarizationAdapter::new(
            Arc::new(LlmSummarizer::new(llm.clone(), settings.llm_model.clone())),
            executor.clone(),
            settings.llm_timeout(),
        );
        let reasoning = ReasoningOverrideAdapter::new(
            Arc::new(OllamaReasoner::new(llm, settings.llm_model.clone())),
            executor.clone(),
            settings.llm_timeout(),
            settings.llm_text_limit,
        );
        let resolver = OverrideResolver::new(HeuristicDetector::new(), reasoning);

        tracing::info!(
            model_path = %model_path.display(),
            classifier_loaded = classifier.is_loaded(),
            ocr = extraction.engine_name(),
            llm_model = %settings.llm_model,
            ollama_url = %settings.ollama_url,
            "Document pipeline configured"
        );

        Ok(Self::new(classifier, extraction, summarization, resolver, executor))
    }

    pub fn classifier_loaded(&self) -> bool {
        self.classifier.is_loaded()
    }

    pub fn stage_workers_in_flight(&self) -> usize {
        self.executor.in_flight()
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Run every stage for one image. Blocking; call from a blocking context.
    pub fn resolve(&self, image: Arc<[u8]>) -> Result<PipelineRun, PipelineError> {
        let start = Instant::now();

        let base = self.classifier.classify(&image)?;
        tracing::info!(
            label = %base.label,
            confidence = base.confidence,
            "Base classifier prediction"
        );

        let extraction = self.extraction.extract(image);
        tracing::info!(outcome = extraction.kind(), "Text extraction finished");
        let raw_text = match extraction {
            StageOutcome::Success(text) => text,
            StageOutcome::TimedOut | StageOutcome::Failed(_) => EXTRACTION_PLACEHOLDER.to_string(),
        };
        let extracted_text = normalize_text(&raw_text);

        let summarization = self.summarization.summarize(&extracted_text);
        tracing::info!(outcome = summarization.kind(), "Summarization finished");
        let summary = summarization
            .ok()
            .unwrap_or_else(|| SUMMARY_PLACEHOLDER.to_string());

        let resolution = self.resolver.resolve(base, &extracted_text);

        tracing::info!(
            label = %resolution.label,
            confidence = resolution.confidence,
            override_reason = %resolution.reason,
            disagreement = resolution.disagreement,
            text_chars = extracted_text.chars().count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Final verdict"
        );

        Ok(PipelineRun {
            base,
            extracted_text,
            summary,
            resolution,
        })
    }

    /// Classify an upload and, when asked to and a store is configured, keep the result.
    pub fn classify_document(
        &self,
        upload: DocumentUpload,
    ) -> Result<ClassificationResult, PipelineError> {
        let request_id = Uuid::new_v4();
        let _span = tracing::info_span!(
            "classify_document",
            request_id = %request_id,
            filename = %upload.filename,
            size = upload.bytes.len(),
        )
        .entered();

        let run = self.resolve(Arc::clone(&upload.bytes))?;

        let persisted_id = match (&self.store, upload.save) {
            (Some(store), true) => match store.store(&run.history_entry(&upload), &upload.owner_id) {
                Ok(id) => {
                    tracing::info!(document_id = %id, "Classification stored");
                    Some(id)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to store classification");
                    None
                }
            },
            _ => None,
        };

        Ok(run.into_result(persisted_id))
    }
}

/// Startup check only: a missing model or an offline Ollama degrades summaries and
/// reasoning to their fallbacks, it never blocks startup.
fn probe_model(client: &dyn LlmClient, model: &str) {
    match client.is_model_available(model) {
        Ok(true) => tracing::info!(model, "LLM model available"),
        Ok(false) => {
            let installed = client.list_models().unwrap_or_default();
            tracing::warn!(
                model,
                installed = ?installed,
                "LLM model not installed, summaries and reasoning will fall back"
            );
        }
        Err(e) => tracing::warn!(model, error = %e, "LLM service unreachable at startup"),
    }
}
