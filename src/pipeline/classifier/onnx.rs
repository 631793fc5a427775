//! ONNX Runtime backend: a ResNet-18 exported with a `[1, 3, 224, 224]` input and
//! 16 logits out.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::TensorRef;

use super::preprocess::{image_to_chw, label_from_logits, INPUT_SIZE};
use super::{ClassifierError, DocumentClassifier};
use crate::models::LabelConfidence;

/// ort::Session::run needs `&mut self`; the mutex lets one loaded model serve every request.
pub struct OnnxDocumentClassifier {
    session: Mutex<Session>,
}

impl OnnxDocumentClassifier {
    pub fn load(model_path: &Path) -> Result<Self, ClassifierError> {
        if !model_path.exists() {
            return Err(ClassifierError::ModelNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| ClassifierError::ModelInit(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e| ClassifierError::ModelInit(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e: ort::Error| ClassifierError::ModelInit(format!("ONNX load failed: {e}")))?;

        tracing::info!(path = %model_path.display(), "ONNX document classifier loaded");

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl DocumentClassifier for OnnxDocumentClassifier {
    fn classify(&self, image_bytes: &[u8]) -> Result<LabelConfidence, ClassifierError> {
        let chw = image_to_chw(image_bytes)?;
        let side = INPUT_SIZE as usize;
        let input = ndarray::Array4::from_shape_vec((1, 3, side, side), chw)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let tensor = TensorRef::from_array_view(&input)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::Inference("Session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| ClassifierError::Inference(format!("ONNX inference failed: {e}")))?;

        let (shape, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("Output extraction: {e}")))?;

        if shape.len() != 2 || shape[0] != 1 {
            return Err(ClassifierError::Inference(format!(
                "Unexpected output shape: {shape:?}, expected [1, 16]"
            )));
        }

        label_from_logits(logits)
    }
}
