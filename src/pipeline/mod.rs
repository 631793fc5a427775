pub mod stage;
pub mod classifier;
pub mod extraction;
pub mod llm;
pub mod summarize;
pub mod heuristic;
pub mod reasoning;
pub mod resolver;
pub mod orchestrator;

pub use orchestrator::*;

use thiserror::Error;

/// Errors that abort a classification request. Stage failures never show up here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Document classifier is unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("Uploaded file is not a readable image: {0}")]
    InvalidImage(String),

    #[error("Classification failed: {0}")]
    Classification(String),
}
