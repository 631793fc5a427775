use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DocumentLabel, OverrideReason};

/// A stored classification, as listed by the history endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub filename: String,
    pub label: DocumentLabel,
    pub confidence: f32,
    pub override_reason: OverrideReason,
    pub disagreement: bool,
    pub summary: Option<String>,
    pub raw_text: Option<String>,
    pub owner_id: String,
    pub content_sha256: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Per-label count for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

/// Count of records per override reason.
#[derive(Debug, Clone, Serialize)]
pub struct OverrideCount {
    pub method: String,
    pub count: i64,
}

/// Count of records within a confidence bucket.
#[derive(Debug, Clone, Serialize)]
pub struct ConfidenceBucket {
    pub range: &'static str,
    pub count: i64,
}

/// Aggregate statistics over stored classifications.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationStats {
    pub total_documents: i64,
    pub label_distribution: Vec<LabelCount>,
    pub confidence_distribution: Vec<ConfidenceBucket>,
    pub override_methods: Vec<OverrideCount>,
    pub disagreement_count: i64,
    /// Percentage of records where the final label matched the base classifier.
    pub agreement_rate: f64,
}
