//! Classification history endpoints.
//!
//! Reads and deletes run on the blocking pool, since every call locks the SQLite connection.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Owner};
use crate::db::{SqliteResultStore, StoreError};
use crate::models::{ClassificationStats, DocumentLabel, DocumentRecord};

/// Cap on the full history listing.
const HISTORY_LIMIT: u32 = 1000;

const RECENT_DEFAULT: u32 = 10;
const RECENT_MAX: u32 = 50;
const BY_LABEL_DEFAULT: u32 = 50;
const BY_LABEL_MAX: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub owner: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: String,
}

/// `GET /api/v1/documents/history`
pub async fn list(
    State(ctx): State<ApiContext>,
    Owner(owner): Owner,
) -> Result<Json<Vec<DocumentRecord>>, ApiError> {
    let records = with_store(&ctx, move |store| store.list_by_owner(&owner, HISTORY_LIMIT)).await?;
    Ok(Json(records))
}

/// `GET /api/v1/documents/history/recent?limit=`
pub async fn recent(
    State(ctx): State<ApiContext>,
    Owner(owner): Owner,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<DocumentRecord>>, ApiError> {
    let limit = check_limit(params.limit, RECENT_DEFAULT, RECENT_MAX)?;
    let records = with_store(&ctx, move |store| store.recent(&owner, limit)).await?;
    Ok(Json(records))
}

/// `GET /api/v1/documents/history/by-label/:label?limit=`
pub async fn by_label(
    State(ctx): State<ApiContext>,
    Owner(owner): Owner,
    Path(label): Path<String>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<DocumentRecord>>, ApiError> {
    let label = DocumentLabel::parse_loose(&label)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown document label: {label}")))?;
    let limit = check_limit(params.limit, BY_LABEL_DEFAULT, BY_LABEL_MAX)?;
    let records = with_store(&ctx, move |store| store.by_label(&owner, label, limit)).await?;
    Ok(Json(records))
}

/// `GET /api/v1/documents/history/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<DocumentRecord>, ApiError> {
    let id = parse_id(&id)?;
    let record = with_store(&ctx, move |store| store.get(&id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Document {id} not found")))?;
    Ok(Json(record))
}

/// `DELETE /api/v1/documents/history/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<DeleteResponse>), ApiError> {
    let id = parse_id(&id)?;
    with_store(&ctx, move |store| store.delete(&id)).await?;
    tracing::info!(document_id = %id, "Document deleted from history");
    Ok((
        StatusCode::OK,
        Json(DeleteResponse {
            deleted: id.to_string(),
        }),
    ))
}

/// `GET /api/v1/documents/stats?owner=`: all owners when `owner` is absent.
pub async fn stats(
    State(ctx): State<ApiContext>,
    Query(params): Query<StatsParams>,
) -> Result<Json<ClassificationStats>, ApiError> {
    let stats = with_store(&ctx, move |store| store.stats(params.owner.as_deref())).await?;
    Ok(Json(stats))
}

async fn with_store<T, F>(ctx: &ApiContext, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SqliteResultStore) -> Result<T, StoreError> + Send + 'static,
{
    let store: Arc<SqliteResultStore> = ctx.history()?;
    let result = tokio::task::spawn_blocking(move || op(&store)).await?;
    Ok(result?)
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid document id: {raw}")))
}

fn check_limit(requested: Option<u32>, default: u32, max: u32) -> Result<u32, ApiError> {
    match requested {
        None => Ok(default),
        Some(limit) if (1..=max).contains(&limit) => Ok(limit),
        Some(limit) => Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {max}, got {limit}"
        ))),
    }
}
