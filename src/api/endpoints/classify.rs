//! Document classification endpoint.
//!
//! `POST /api/v1/classify` receives one image as multipart field `file`, validates it,
//! and runs the pipeline on the blocking pool.

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::api::error::{ApiError, ValidationError};
use crate::api::types::{ApiContext, Owner};
use crate::config::Settings;
use crate::models::{ClassificationResult, DocumentLabel, OverrideReason};
use crate::pipeline::DocumentUpload;

const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct ClassifyParams {
    /// Store the result in history. Ignored when history is disabled.
    #[serde(default = "default_save")]
    pub save: bool,
}

fn default_save() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub label: DocumentLabel,
    pub confidence: String,
    pub text: String,
    pub summary: String,
    pub override_reason: OverrideReason,
    pub disagreement: bool,
    pub document_id: Option<String>,
}

impl From<ClassificationResult> for ClassifyResponse {
    fn from(result: ClassificationResult) -> Self {
        Self {
            label: result.label,
            confidence: result.confidence,
            text: result.extracted_text,
            summary: result.summary,
            override_reason: result.override_reason,
            disagreement: result.disagreement,
            document_id: result.persisted_id.map(|id| id.to_string()),
        }
    }
}

/// Uploaded file after multipart parsing, before validation.
struct RawUpload {
    filename: String,
    bytes: Vec<u8>,
}

/// `POST /api/v1/classify?save=bool`
pub async fn classify(
    State(ctx): State<ApiContext>,
    Owner(owner_id): Owner,
    Query(params): Query<ClassifyParams>,
    multipart: Multipart,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let raw = read_file_field(multipart).await?;
    validate_upload(&ctx.settings, &raw)?;

    let content_sha256 = format!("{:x}", Sha256::digest(&raw.bytes));
    tracing::info!(
        filename = %raw.filename,
        size = raw.bytes.len(),
        owner = %owner_id,
        sha256 = %content_sha256,
        "Classification requested"
    );

    let upload = DocumentUpload {
        filename: raw.filename,
        bytes: Arc::from(raw.bytes),
        owner_id,
        save: params.save,
        content_sha256: Some(content_sha256),
    };

    let pipeline = Arc::clone(&ctx.pipeline);
    let result = tokio::task::spawn_blocking(move || pipeline.classify_document(upload)).await??;

    Ok(Json(result.into()))
}

async fn read_file_field(mut multipart: Multipart) -> Result<RawUpload, ValidationError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ValidationError::Multipart(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ValidationError::Multipart(e.body_text()))?;
        return Ok(RawUpload {
            filename,
            bytes: bytes.to_vec(),
        });
    }
    Err(ValidationError::MissingField(FILE_FIELD))
}

fn validate_upload(settings: &Settings, raw: &RawUpload) -> Result<(), ValidationError> {
    if !settings.is_allowed_file(&raw.filename) {
        return Err(ValidationError::DisallowedType(format!(
            "'{}' (allowed: {})",
            raw.filename,
            settings.allowed_extensions.join(", ")
        )));
    }
    let is_image = mime_guess::from_path(&raw.filename)
        .first()
        .is_some_and(|mime| mime.type_().as_str() == "image");
    if !is_image {
        return Err(ValidationError::DisallowedType(raw.filename.clone()));
    }
    if raw.bytes.is_empty() {
        return Err(ValidationError::Empty);
    }
    if raw.bytes.len() > settings.max_file_size {
        return Err(ValidationError::TooLarge {
            size: raw.bytes.len(),
            limit: settings.max_file_size,
        });
    }
    Ok(())
}
