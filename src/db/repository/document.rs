use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::*;

const SELECT_COLUMNS: &str = "SELECT id, filename, label, confidence, override_reason, disagreement,
     summary, raw_text, owner_id, content_sha256, created_at
     FROM documents";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Confidence buckets for the stats endpoint, highest first. Bounds are `[min, max)`.
const CONFIDENCE_BUCKETS: [(&str, f64, f64); 4] = [
    ("Very High (≥90%)", 0.90, f64::INFINITY),
    ("High (75-89%)", 0.75, 0.90),
    ("Medium (60-74%)", 0.60, 0.75),
    ("Low (<60%)", f64::NEG_INFINITY, 0.60),
];

/// f32 confidences widen to values like 0.8999999761; keep four decimals so bucket bounds hold.
fn stored_confidence(confidence: f32) -> f64 {
    (confidence as f64 * 10_000.0).round() / 10_000.0
}

pub fn insert_document(conn: &Connection, doc: &DocumentRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO documents (id, filename, label, confidence, override_reason, disagreement,
         summary, raw_text, owner_id, content_sha256, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            doc.id.to_string(),
            doc.filename,
            doc.label.as_str(),
            stored_confidence(doc.confidence),
            doc.override_reason.as_str(),
            doc.disagreement as i32,
            doc.summary,
            doc.raw_text,
            doc.owner_id,
            doc.content_sha256,
            doc.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_document(conn: &Connection, id: &Uuid) -> Result<Option<DocumentRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
    let row = stmt
        .query_row(params![id.to_string()], read_row)
        .optional()?;
    row.map(document_from_row).transpose()
}

/// All records of `owner_id`, newest first.
pub fn list_documents_by_owner(
    conn: &Connection,
    owner_id: &str,
    limit: u32,
) -> Result<Vec<DocumentRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![owner_id, limit], read_row)?;
    collect_documents(rows)
}

/// The `limit` newest records of `owner_id`.
pub fn recent_documents(
    conn: &Connection,
    owner_id: &str,
    limit: u32,
) -> Result<Vec<DocumentRecord>, DatabaseError> {
    list_documents_by_owner(conn, owner_id, limit)
}

pub fn documents_by_label(
    conn: &Connection,
    owner_id: &str,
    label: DocumentLabel,
    limit: u32,
) -> Result<Vec<DocumentRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} WHERE owner_id = ?1 AND label = ?2
         ORDER BY created_at DESC, rowid DESC LIMIT ?3"
    ))?;
    let rows = stmt.query_map(params![owner_id, label.as_str(), limit], read_row)?;
    collect_documents(rows)
}

pub fn delete_document(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Document".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Aggregate statistics, optionally restricted to one owner.
pub fn classification_stats(
    conn: &Connection,
    owner_id: Option<&str>,
) -> Result<ClassificationStats, DatabaseError> {
    let total_documents: i64 = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE (?1 IS NULL OR owner_id = ?1)",
        params![owner_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT label, COUNT(*) FROM documents WHERE (?1 IS NULL OR owner_id = ?1)
         GROUP BY label ORDER BY COUNT(*) DESC, label",
    )?;
    let label_distribution = stmt
        .query_map(params![owner_id], |row| {
            Ok(LabelCount {
                label: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut confidence_distribution = Vec::with_capacity(CONFIDENCE_BUCKETS.len());
    for (range, min, max) in CONFIDENCE_BUCKETS {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE (?1 IS NULL OR owner_id = ?1)
             AND confidence >= ?2 AND confidence < ?3",
            params![owner_id, min, max],
            |row| row.get(0),
        )?;
        confidence_distribution.push(ConfidenceBucket { range, count });
    }

    let mut stmt = conn.prepare(
        "SELECT override_reason, COUNT(*) FROM documents WHERE (?1 IS NULL OR owner_id = ?1)
         GROUP BY override_reason ORDER BY COUNT(*) DESC, override_reason",
    )?;
    let override_methods = stmt
        .query_map(params![owner_id], |row| {
            Ok(OverrideCount {
                method: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let disagreement_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE (?1 IS NULL OR owner_id = ?1) AND disagreement = 1",
        params![owner_id],
        |row| row.get(0),
    )?;

    let agreement_rate = if total_documents > 0 {
        (total_documents - disagreement_count) as f64 / total_documents as f64 * 100.0
    } else {
        0.0
    };

    Ok(ClassificationStats {
        total_documents,
        label_distribution,
        confidence_distribution,
        override_methods,
        disagreement_count,
        agreement_rate,
    })
}

// Internal row type for DocumentRecord mapping
struct DocumentRow {
    id: String,
    filename: String,
    label: String,
    confidence: f64,
    override_reason: String,
    disagreement: i32,
    summary: Option<String>,
    raw_text: Option<String>,
    owner_id: String,
    content_sha256: Option<String>,
    created_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        filename: row.get(1)?,
        label: row.get(2)?,
        confidence: row.get(3)?,
        override_reason: row.get(4)?,
        disagreement: row.get(5)?,
        summary: row.get(6)?,
        raw_text: row.get(7)?,
        owner_id: row.get(8)?,
        content_sha256: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn collect_documents(
    rows: impl Iterator<Item = rusqlite::Result<DocumentRow>>,
) -> Result<Vec<DocumentRecord>, DatabaseError> {
    rows.map(|row| document_from_row(row?)).collect()
}

fn document_from_row(row: DocumentRow) -> Result<DocumentRecord, DatabaseError> {
    Ok(DocumentRecord {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        filename: row.filename,
        label: DocumentLabel::from_str(&row.label)?,
        confidence: row.confidence as f32,
        override_reason: OverrideReason::from_str(&row.override_reason)?,
        disagreement: row.disagreement != 0,
        summary: row.summary,
        raw_text: row.raw_text,
        owner_id: row.owner_id,
        content_sha256: row.content_sha256,
        created_at: NaiveDateTime::parse_from_str(&row.created_at, TIMESTAMP_FORMAT)
            .map_err(|e| DatabaseError::ConstraintViolation(format!("created_at: {e}")))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use chrono::{Duration, NaiveDate};

    fn record(owner: &str, label: DocumentLabel, confidence: f32, minute: i64) -> DocumentRecord {
        let base = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        DocumentRecord {
            id: Uuid::new_v4(),
            filename: format!("scan-{minute}.png"),
            label,
            confidence,
            override_reason: OverrideReason::BaseClassifier,
            disagreement: false,
            summary: Some("A short summary.".into()),
            raw_text: Some("raw ocr text".into()),
            owner_id: owner.into(),
            content_sha256: None,
            created_at: base + Duration::minutes(minute),
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let mut doc = record("alice", DocumentLabel::NewsArticle, 0.8123, 0);
        doc.override_reason = OverrideReason::HeuristicOverride;
        doc.disagreement = true;
        doc.content_sha256 = Some("ab".repeat(32));
        insert_document(&conn, &doc).unwrap();

        let loaded = get_document(&conn, &doc.id).unwrap().unwrap();
        assert_eq!(loaded.label, DocumentLabel::NewsArticle);
        assert_eq!(loaded.override_reason, OverrideReason::HeuristicOverride);
        assert!(loaded.disagreement);
        assert_eq!(loaded.created_at, doc.created_at);
        assert_eq!(loaded.content_sha256, doc.content_sha256);
        assert!((loaded.confidence - 0.8123).abs() < 1e-6);
    }

    #[test]
    fn get_missing_returns_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_document(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn owner_listing_is_newest_first_and_scoped() {
        let conn = open_memory_database().unwrap();
        for minute in 0..5 {
            insert_document(&conn, &record("alice", DocumentLabel::Memo, 0.9, minute)).unwrap();
        }
        insert_document(&conn, &record("bob", DocumentLabel::Memo, 0.9, 10)).unwrap();

        let docs = list_documents_by_owner(&conn, "alice", 1000).unwrap();
        assert_eq!(docs.len(), 5);
        assert!(docs.iter().all(|d| d.owner_id == "alice"));
        assert!(docs.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        let recent = recent_documents(&conn, "alice", 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].filename, "scan-4.png");
    }

    #[test]
    fn filter_by_label() {
        let conn = open_memory_database().unwrap();
        insert_document(&conn, &record("alice", DocumentLabel::Invoice, 0.9, 0)).unwrap();
        insert_document(&conn, &record("alice", DocumentLabel::Resume, 0.9, 1)).unwrap();
        insert_document(&conn, &record("alice", DocumentLabel::Invoice, 0.9, 2)).unwrap();

        let invoices = documents_by_label(&conn, "alice", DocumentLabel::Invoice, 50).unwrap();
        assert_eq!(invoices.len(), 2);
        assert!(invoices.iter().all(|d| d.label == DocumentLabel::Invoice));
    }

    #[test]
    fn delete_missing_is_not_found() {
        let conn = open_memory_database().unwrap();
        let doc = record("alice", DocumentLabel::Form, 0.5, 0);
        insert_document(&conn, &doc).unwrap();

        delete_document(&conn, &doc.id).unwrap();
        assert!(get_document(&conn, &doc.id).unwrap().is_none());
        assert!(matches!(
            delete_document(&conn, &doc.id),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn stats_on_empty_database() {
        let conn = open_memory_database().unwrap();
        let stats = classification_stats(&conn, None).unwrap();
        assert_eq!(stats.total_documents, 0);
        assert_eq!(stats.agreement_rate, 0.0);
        assert_eq!(stats.confidence_distribution.len(), 4);
        assert!(stats.confidence_distribution.iter().all(|b| b.count == 0));
    }

    #[test]
    fn stats_buckets_and_agreement() {
        let conn = open_memory_database().unwrap();
        let confidences = [0.95, 0.90, 0.895, 0.75, 0.6, 0.2];
        for (i, c) in confidences.iter().enumerate() {
            let mut doc = record("alice", DocumentLabel::Letter, *c, i as i64);
            if i == 0 {
                doc.disagreement = true;
                doc.override_reason = OverrideReason::ReasoningOverride;
            }
            insert_document(&conn, &doc).unwrap();
        }
        insert_document(&conn, &record("bob", DocumentLabel::Budget, 0.99, 9)).unwrap();

        let stats = classification_stats(&conn, Some("alice")).unwrap();
        assert_eq!(stats.total_documents, 6);
        let counts: Vec<i64> = stats.confidence_distribution.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 2, 1, 1]);
        assert_eq!(stats.disagreement_count, 1);
        assert!((stats.agreement_rate - 5.0 / 6.0 * 100.0).abs() < 1e-9);
        assert_eq!(stats.label_distribution.len(), 1);
        assert_eq!(stats.label_distribution[0].label, "Letter");
        assert_eq!(stats.override_methods[0].method, "base_classifier");
        assert_eq!(stats.override_methods[0].count, 5);

        let all = classification_stats(&conn, None).unwrap();
        assert_eq!(all.total_documents, 7);
    }
}
