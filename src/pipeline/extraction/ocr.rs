use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use image::ImageOutputFormat;

use super::ExtractionError;

/// Reads the text off a document image.
pub trait OcrEngine: Send + Sync {
    fn extract_text(&self, image_bytes: &[u8]) -> Result<String, ExtractionError>;

    /// Short engine name for logs.
    fn name(&self) -> &'static str;
}

/// Tesseract driven through its command-line binary.
///
/// The image is flattened to grayscale PNG, written to a temp file and read back
/// with `tesseract <file> stdout`. The temp file is removed when the call returns.
pub struct TesseractCli {
    binary: PathBuf,
    lang: String,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            lang: "eng".to_string(),
        }
    }

    /// Set language(s) for OCR (e.g., "eng", "eng+fra")
    pub fn with_languages(mut self, langs: &str) -> Self {
        self.lang = langs.to_string();
        self
    }

    /// Render the upload as a grayscale PNG for Tesseract.
    fn grayscale_png(image_bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
        let img = image::load_from_memory(image_bytes)
            .map_err(|e| ExtractionError::ImageProcessing(format!("Failed to decode image: {e}")))?;
        let mut cursor = Cursor::new(Vec::new());
        img.grayscale()
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
        Ok(cursor.into_inner())
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl OcrEngine for TesseractCli {
    fn extract_text(&self, image_bytes: &[u8]) -> Result<String, ExtractionError> {
        let png = Self::grayscale_png(image_bytes)?;

        let mut file = tempfile::Builder::new()
            .prefix("docsort-ocr-")
            .suffix(".png")
            .tempfile()?;
        file.write_all(&png)?;
        file.flush()?;

        let output = Command::new(&self.binary)
            .arg(file.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .output()
            .map_err(|e| {
                ExtractionError::OcrInit(format!("cannot run {}: {e}", self.binary.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::OcrProcessing(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }
}

/// Mock OCR engine for tests.
pub struct MockOcrEngine {
    text: Result<String, String>,
    delay: Option<Duration>,
}

impl MockOcrEngine {
    pub fn new(text: &str) -> Self {
        Self {
            text: Ok(text.to_string()),
            delay: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            text: Err(reason.to_string()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl OcrEngine for MockOcrEngine {
    fn extract_text(&self, _image_bytes: &[u8]) -> Result<String, ExtractionError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.text.clone().map_err(ExtractionError::OcrProcessing)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
