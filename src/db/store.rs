//! Result store: where finished classifications go when the caller asks to keep them.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use super::{
    classification_stats, delete_document, documents_by_label, get_document, insert_document,
    list_documents_by_owner, open_database, open_memory_database, recent_documents, DatabaseError,
};
use crate::models::{ClassificationStats, DocumentLabel, DocumentRecord, OverrideReason};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("History database lock poisoned")]
    LockPoisoned,
}

/// What the pipeline hands over for storage. The store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub filename: String,
    pub label: DocumentLabel,
    pub confidence: f32,
    pub override_reason: OverrideReason,
    pub disagreement: bool,
    pub summary: String,
    pub raw_text: String,
    pub content_sha256: Option<String>,
}

/// Persistence seam for the orchestrator.
pub trait ResultStore: Send + Sync {
    fn store(&self, entry: &HistoryEntry, owner_id: &str) -> Result<Uuid, StoreError>;
}

/// SQLite-backed history. One connection, serialized behind a mutex.
pub struct SqliteResultStore {
    conn: Mutex<Connection>,
}

impl SqliteResultStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = open_database(path)?;
        tracing::info!(path = %path.display(), "History database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Mutex::new(open_memory_database()?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    pub fn get(&self, id: &Uuid) -> Result<Option<DocumentRecord>, StoreError> {
        Ok(get_document(&*self.conn()?, id)?)
    }

    pub fn list_by_owner(&self, owner_id: &str, limit: u32) -> Result<Vec<DocumentRecord>, StoreError> {
        Ok(list_documents_by_owner(&*self.conn()?, owner_id, limit)?)
    }

    pub fn recent(&self, owner_id: &str, limit: u32) -> Result<Vec<DocumentRecord>, StoreError> {
        Ok(recent_documents(&*self.conn()?, owner_id, limit)?)
    }

    pub fn by_label(
        &self,
        owner_id: &str,
        label: DocumentLabel,
        limit: u32,
    ) -> Result<Vec<DocumentRecord>, StoreError> {
        Ok(documents_by_label(&*self.conn()?, owner_id, label, limit)?)
    }

    pub fn delete(&self, id: &Uuid) -> Result<(), StoreError> {
        Ok(delete_document(&*self.conn()?, id)?)
    }

    pub fn stats(&self, owner_id: Option<&str>) -> Result<ClassificationStats, StoreError> {
        Ok(classification_stats(&*self.conn()?, owner_id)?)
    }
}

impl ResultStore for SqliteResultStore {
    fn store(&self, entry: &HistoryEntry, owner_id: &str) -> Result<Uuid, StoreError> {
        let record = DocumentRecord {
            id: Uuid::new_v4(),
            filename: entry.filename.clone(),
            label: entry.label,
            confidence: entry.confidence,
            override_reason: entry.override_reason,
            disagreement: entry.disagreement,
            summary: Some(entry.summary.clone()),
            raw_text: Some(entry.raw_text.clone()),
            owner_id: owner_id.to_string(),
            content_sha256: entry.content_sha256.clone(),
            created_at: Utc::now().naive_utc(),
        };
        insert_document(&*self.conn()?, &record)?;
        Ok(record.id)
    }
}
