//! Shared types for the HTTP layer.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::api::error::ApiError;
use crate::config::Settings;
use crate::db::SqliteResultStore;
use crate::pipeline::PipelineOrchestrator;

/// Header naming the caller that owns stored documents.
pub const OWNER_HEADER: &str = "x-owner-id";

/// Owner used when the caller sends no owner header.
pub const ANONYMOUS_OWNER: &str = "anonymous";

/// Shared context for all routes.
#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<PipelineOrchestrator>,
    pub history: Option<Arc<SqliteResultStore>>,
    pub settings: Arc<Settings>,
}

impl ApiContext {
    pub fn new(
        pipeline: Arc<PipelineOrchestrator>,
        history: Option<Arc<SqliteResultStore>>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            pipeline,
            history,
            settings,
        }
    }

    /// The history store, or 503 when the service runs without one.
    pub fn history(&self) -> Result<Arc<SqliteResultStore>, ApiError> {
        self.history.clone().ok_or(ApiError::HistoryDisabled)
    }
}

/// Caller identity taken from the `X-Owner-Id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let owner = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(ANONYMOUS_OWNER);
        Ok(Owner(owner.to_string()))
    }
}
