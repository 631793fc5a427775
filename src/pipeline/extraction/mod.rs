pub mod sanitize;
pub mod ocr;
pub mod vision_ocr;

pub use sanitize::*;
pub use ocr::*;
pub use vision_ocr::*;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::stage::{StageExecutor, StageOutcome};

/// Stands in for the OCR text when extraction times out or fails.
pub const EXTRACTION_PLACEHOLDER: &str = "Text extraction failed or timed out.";

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),
}

/// Runs the configured OCR engine under the extraction deadline.
pub struct TextExtractionAdapter {
    engine: Arc<dyn OcrEngine>,
    executor: StageExecutor,
    timeout: Duration,
}

impl TextExtractionAdapter {
    pub fn new(engine: Arc<dyn OcrEngine>, executor: StageExecutor, timeout: Duration) -> Self {
        Self {
            engine,
            executor,
            timeout,
        }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Raw OCR text, or why there is none.
    pub fn extract(&self, image: Arc<[u8]>) -> StageOutcome<String> {
        let engine = Arc::clone(&self.engine);
        self.executor
            .run("ocr", self.timeout, move || engine.extract_text(&image))
    }
}
