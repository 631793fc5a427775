//! Vision OCR engine: reads document images through an Ollama vision model.
//!
//! Used instead of Tesseract when `--ocr-backend vision` is set. The model gets the
//! image as base64 on `/api/chat` and is asked for plain text only.

use std::sync::Arc;

use base64::Engine as _;

use super::ocr::OcrEngine;
use super::ExtractionError;
use crate::pipeline::llm::VisionClient;

const SYSTEM_PROMPT: &str = "\
You are an OCR engine. Transcribe the text visible in the document image exactly as written. \
Do not describe the image, do not summarize, do not add commentary.";

const USER_PROMPT: &str = "\
Extract all visible text from this document image. \
Return plain text only. If the image contains no readable text, return nothing.";

/// Production vision OCR engine backed by Ollama.
pub struct OllamaVisionOcr {
    vision_client: Arc<dyn VisionClient>,
    model_name: String,
}

impl OllamaVisionOcr {
    pub fn new(vision_client: Arc<dyn VisionClient>, model_name: String) -> Self {
        Self {
            vision_client,
            model_name,
        }
    }
}

impl OcrEngine for OllamaVisionOcr {
    fn extract_text(&self, image_bytes: &[u8]) -> Result<String, ExtractionError> {
        let _span = tracing::info_span!(
            "vision_ocr_extract",
            model = %self.model_name,
            image_size = image_bytes.len(),
        )
        .entered();
        let start = std::time::Instant::now();

        let images = vec![base64::engine::general_purpose::STANDARD.encode(image_bytes)];

        let raw_response = self
            .vision_client
            .chat_with_images(&self.model_name, USER_PROMPT, &images, Some(SYSTEM_PROMPT))
            .map_err(|e| ExtractionError::OcrProcessing(format!("Vision OCR failed: {e}")))?;

        let text = strip_code_fence(&raw_response);

        tracing::info!(
            model = %self.model_name,
            elapsed_ms = %start.elapsed().as_millis(),
            text_len = text.len(),
            "Vision OCR extraction complete"
        );

        Ok(text)
    }

    fn name(&self) -> &'static str {
        "vision"
    }
}

/// Vision models like to wrap transcriptions in a Markdown fence.
fn strip_code_fence(response: &str) -> String {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the optional info string on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}
