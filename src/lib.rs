pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::config::Settings;
use crate::db::{ResultStore, SqliteResultStore, StoreError};
use crate::pipeline::llm::LlmError;
use crate::pipeline::PipelineOrchestrator;

/// Startup and serving failures. Per-request failures never reach this level.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid bind address: {0}")]
    BindAddress(#[from] std::net::AddrParseError),

    #[error("History database: {0}")]
    Store(#[from] StoreError),

    #[error("LLM client: {0}")]
    Llm(#[from] LlmError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the service and block until it shuts down.
pub fn run(settings: Settings) -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("docsort starting v{}", config::APP_VERSION);

    let addr = settings.bind_addr()?;

    let history = match settings.resolved_database_path() {
        Some(path) => {
            tracing::info!(path = %path.display(), "Opening history database");
            Some(Arc::new(SqliteResultStore::open(&path)?))
        }
        None => {
            tracing::warn!("History disabled, results will not be stored");
            None
        }
    };

    // Blocking HTTP clients must be built (and dropped) outside the async runtime.
    let mut orchestrator = PipelineOrchestrator::from_settings(&settings)?;
    if let Some(store) = &history {
        orchestrator = orchestrator.with_store(Arc::clone(store) as Arc<dyn ResultStore>);
    }
    let pipeline = Arc::new(orchestrator);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(settings.max_blocking_threads.max(1))
        .build()?;

    let ctx = ApiContext::new(Arc::clone(&pipeline), history, Arc::new(settings));
    let served = runtime.block_on(api::serve(ctx, addr));
    drop(runtime);
    drop(pipeline);

    served?;
    tracing::info!("docsort stopped");
    Ok(())
}
