//! Base image classifier.
//!
//! Loaded once at startup and shared read-only by every request. When loading fails
//! the adapter keeps the failure and every classification reports it.

pub mod preprocess;
#[cfg(feature = "onnx-classifier")]
pub mod onnx;

pub use preprocess::*;
#[cfg(feature = "onnx-classifier")]
pub use onnx::*;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::PipelineError;
use crate::models::LabelConfidence;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Classifier model not found at: {0}")]
    ModelNotFound(PathBuf),

    #[error("Classifier initialization failed: {0}")]
    ModelInit(String),

    #[error("Built without ONNX support (enable the `onnx-classifier` feature)")]
    BackendDisabled,

    #[error("Image cannot be decoded: {0}")]
    InvalidImage(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

pub trait DocumentClassifier: Send + Sync {
    fn classify(&self, image_bytes: &[u8]) -> Result<LabelConfidence, ClassifierError>;
}

/// Load the production classifier from `model_path`.
#[cfg(feature = "onnx-classifier")]
pub fn load_classifier(model_path: &Path) -> Result<Arc<dyn DocumentClassifier>, ClassifierError> {
    Ok(Arc::new(OnnxDocumentClassifier::load(model_path)?))
}

/// Load the production classifier from `model_path`.
#[cfg(not(feature = "onnx-classifier"))]
pub fn load_classifier(model_path: &Path) -> Result<Arc<dyn DocumentClassifier>, ClassifierError> {
    tracing::warn!(
        path = %model_path.display(),
        "ONNX support not compiled in, classifier unavailable"
    );
    Err(ClassifierError::BackendDisabled)
}

/// Owns the process-wide classifier, or the reason it could not be loaded.
pub struct BaseClassifierAdapter {
    classifier: Result<Arc<dyn DocumentClassifier>, String>,
}

impl BaseClassifierAdapter {
    pub fn new(classifier: Arc<dyn DocumentClassifier>) -> Self {
        Self {
            classifier: Ok(classifier),
        }
    }

    /// Adapter for a classifier that failed to load.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            classifier: Err(reason.into()),
        }
    }

    pub fn from_load(result: Result<Arc<dyn DocumentClassifier>, ClassifierError>) -> Self {
        match result {
            Ok(classifier) => Self::new(classifier),
            Err(e) => {
                tracing::error!(error = %e, "Base classifier failed to load");
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.classifier.is_ok()
    }

    /// Synchronous, no deadline: the classifier is the one stage that must answer.
    pub fn classify(&self, image_bytes: &[u8]) -> Result<LabelConfidence, PipelineError> {
        let classifier = self
            .classifier
            .as_ref()
            .map_err(|reason| PipelineError::ClassifierUnavailable(reason.clone()))?;

        classifier.classify(image_bytes).map_err(|e| match e {
            ClassifierError::InvalidImage(reason) => PipelineError::InvalidImage(reason),
            other => PipelineError::Classification(other.to_string()),
        })
    }
}

/// Fixed-answer classifier for tests.
pub struct MockClassifier {
    answer: LabelConfidence,
}

impl MockClassifier {
    pub fn new(answer: LabelConfidence) -> Self {
        Self { answer }
    }
}

impl DocumentClassifier for MockClassifier {
    fn classify(&self, _image_bytes: &[u8]) -> Result<LabelConfidence, ClassifierError> {
        Ok(self.answer)
    }
}

/// Mock that decodes the image first, so undecodable uploads fail like in production.
pub struct DecodingMockClassifier {
    answer: LabelConfidence,
}

impl DecodingMockClassifier {
    pub fn new(answer: LabelConfidence) -> Self {
        Self { answer }
    }
}

impl DocumentClassifier for DecodingMockClassifier {
    fn classify(&self, image_bytes: &[u8]) -> Result<LabelConfidence, ClassifierError> {
        image_to_chw(image_bytes)?;
        Ok(self.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentLabel;

    #[test]
    fn loaded_adapter_returns_prediction() {
        let adapter = BaseClassifierAdapter::new(Arc::new(MockClassifier::new(
            LabelConfidence::new(DocumentLabel::Budget, 0.66),
        )));
        assert!(adapter.is_loaded());
        let lc = adapter.classify(b"anything").unwrap();
        assert_eq!(lc.label, DocumentLabel::Budget);
    }

    #[test]
    fn unavailable_adapter_fails_every_call() {
        let adapter = BaseClassifierAdapter::unavailable("weights missing");
        assert!(!adapter.is_loaded());
        for _ in 0..3 {
            assert!(matches!(
                adapter.classify(b"img"),
                Err(PipelineError::ClassifierUnavailable(_))
            ));
        }
    }

    #[test]
    fn undecodable_image_maps_to_invalid_image() {
        let adapter = BaseClassifierAdapter::new(Arc::new(DecodingMockClassifier::new(
            LabelConfidence::new(DocumentLabel::Memo, 0.5),
        )));
        assert!(matches!(
            adapter.classify(b"garbage"),
            Err(PipelineError::InvalidImage(_))
        ));
    }

    #[test]
    fn missing_model_leaves_adapter_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = BaseClassifierAdapter::from_load(load_classifier(&dir.path().join("none.onnx")));
        assert!(!adapter.is_loaded());
    }

    #[cfg(feature = "onnx-classifier")]
    #[test]
    fn onnx_backend_reports_missing_weights() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("none.onnx");
        assert!(matches!(
            load_classifier(&missing),
            Err(ClassifierError::ModelNotFound(path)) if path == missing
        ));
    }
}
