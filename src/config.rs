use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Application-level constants
pub const APP_NAME: &str = "docsort";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,docsort_lib=debug,tower_http=debug"
    } else {
        "info"
    }
}

/// Application data directory: the platform data dir (e.g. `~/.local/share/docsort`),
/// falling back to the working directory when the platform has none.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Get the models directory (for the ONNX classifier)
pub fn models_dir() -> PathBuf {
    app_data_dir().join("models")
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
const DEFAULT_ALLOWED_EXTENSIONS: &str = ".png,.jpg,.jpeg,.tif,.tiff,.bmp";
const DEFAULT_OCR_TIMEOUT_SECS: u64 = 15;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 20;
const DEFAULT_LLM_TEXT_LIMIT: usize = 2000;
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_LLM_MODEL: &str = "mistral";
const DEFAULT_VISION_MODEL: &str = "llava";
const DEFAULT_TESSERACT_BIN: &str = "tesseract";
const DEFAULT_TESSERACT_LANG: &str = "eng";
const DEFAULT_MAX_BLOCKING_THREADS: usize = 64;

/// OCR engine selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OcrBackend {
    /// Tesseract command-line binary
    Tesseract,
    /// Ollama vision model
    Vision,
}

/// Service settings. CLI flags win over `DOCSORT_*` environment variables, which win
/// over the defaults.
#[derive(Parser, Debug, Clone)]
#[command(name = "docsort")]
#[command(about = "Document-type classification service")]
#[command(version)]
pub struct Settings {
    /// Address to bind the HTTP server to
    #[arg(long, default_value = DEFAULT_HOST, env = "DOCSORT_HOST")]
    pub host: String,

    /// HTTP port
    #[arg(long, short = 'p', default_value_t = DEFAULT_PORT, env = "DOCSORT_PORT")]
    pub port: u16,

    /// ONNX classifier weights (defaults to <data dir>/models/document_classifier.onnx)
    #[arg(long, env = "DOCSORT_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Largest accepted upload, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE, env = "DOCSORT_MAX_FILE_SIZE")]
    pub max_file_size: usize,

    /// Accepted upload extensions
    #[arg(
        long,
        value_delimiter = ',',
        default_value = DEFAULT_ALLOWED_EXTENSIONS,
        env = "DOCSORT_ALLOWED_EXTENSIONS"
    )]
    pub allowed_extensions: Vec<String>,

    /// Deadline for text extraction, in seconds
    #[arg(long, default_value_t = DEFAULT_OCR_TIMEOUT_SECS, env = "DOCSORT_OCR_TIMEOUT")]
    pub ocr_timeout_secs: u64,

    /// Deadline for each LLM call (summary, reasoning), in seconds
    #[arg(long, default_value_t = DEFAULT_LLM_TIMEOUT_SECS, env = "DOCSORT_LLM_TIMEOUT")]
    pub llm_timeout_secs: u64,

    /// Characters of OCR text sent to the reasoning model
    #[arg(long, default_value_t = DEFAULT_LLM_TEXT_LIMIT, env = "DOCSORT_LLM_TEXT_LIMIT")]
    pub llm_text_limit: usize,

    /// Ollama base URL
    #[arg(long, default_value = DEFAULT_OLLAMA_URL, env = "DOCSORT_OLLAMA_URL")]
    pub ollama_url: String,

    /// Ollama model used for summaries and reasoning
    #[arg(long, default_value = DEFAULT_LLM_MODEL, env = "DOCSORT_LLM_MODEL")]
    pub llm_model: String,

    /// OCR engine
    #[arg(long, value_enum, default_value = "tesseract", env = "DOCSORT_OCR_BACKEND")]
    pub ocr_backend: OcrBackend,

    /// Ollama vision model for `--ocr-backend vision`
    #[arg(long, default_value = DEFAULT_VISION_MODEL, env = "DOCSORT_VISION_MODEL")]
    pub vision_model: String,

    /// Tesseract binary
    #[arg(long, default_value = DEFAULT_TESSERACT_BIN, env = "DOCSORT_TESSERACT_BIN")]
    pub tesseract_bin: PathBuf,

    /// Tesseract language(s), e.g. "eng" or "eng+fra"
    #[arg(long, default_value = DEFAULT_TESSERACT_LANG, env = "DOCSORT_TESSERACT_LANG")]
    pub tesseract_lang: String,

    /// History database (defaults to <data dir>/documents.db)
    #[arg(long, env = "DOCSORT_DATABASE_PATH")]
    pub database_path: Option<PathBuf>,

    /// Run without a history database
    #[arg(long, env = "DOCSORT_NO_HISTORY")]
    pub no_history: bool,

    /// Upper bound on the runtime's blocking thread pool (one pipeline run each)
    #[arg(long, default_value_t = DEFAULT_MAX_BLOCKING_THREADS, env = "DOCSORT_MAX_BLOCKING_THREADS")]
    pub max_blocking_threads: usize,
}

impl Settings {
    pub fn resolved_model_path(&self) -> PathBuf {
        self.model_path
            .clone()
            .unwrap_or_else(|| models_dir().join("document_classifier.onnx"))
    }

    /// `None` when history is disabled.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        if self.no_history {
            return None;
        }
        Some(
            self.database_path
                .clone()
                .unwrap_or_else(|| app_data_dir().join("documents.db")),
        )
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Case-insensitive extension check; `filename` must carry one of the allowed suffixes.
    pub fn is_allowed_file(&self, filename: &str) -> bool {
        let Some(ext) = Path::new(filename).extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = format!(".{}", ext.to_ascii_lowercase());
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(&ext))
    }
}

/// Built-in defaults, independent of the command line and environment.
impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_path: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .split(',')
                .map(str::to_string)
                .collect(),
            ocr_timeout_secs: DEFAULT_OCR_TIMEOUT_SECS,
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            llm_text_limit: DEFAULT_LLM_TEXT_LIMIT,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            ocr_backend: OcrBackend::Tesseract,
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            tesseract_bin: PathBuf::from(DEFAULT_TESSERACT_BIN),
            tesseract_lang: DEFAULT_TESSERACT_LANG.to_string(),
            database_path: None,
            no_history: false,
            max_blocking_threads: DEFAULT_MAX_BLOCKING_THREADS,
        }
    }
}
