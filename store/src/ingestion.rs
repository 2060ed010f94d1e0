use crate::error::Result;
use crate::Store;
use arbihawk_instrument::{IngestionMetadata, RunHistory, ValidationStatus};
use arbihawk_markets::Domain;
use rusqlite::{params, OptionalExtension};
use std::str::FromStr;

impl Store {
    /// Records one ingestion attempt. A prior row sharing `(source, checksum)`
    /// is rejected as a duplicate (§3: the `UNIQUE(source, checksum)`
    /// constraint) without the caller needing its own pre-check — idempotency
    /// holds under replay either way.
    pub fn record_ingestion(&self, metadata: &IngestionMetadata) -> Result<IngestionOutcome> {
        self.with_conn(|conn| {
            let errors = serde_json::to_string(&metadata.errors)?;
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO ingestion_metadata
                    (source, ingested_at, records_count, checksum, validation_status, errors)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    metadata.source,
                    metadata.ingested_at,
                    metadata.records_count,
                    metadata.checksum,
                    status_str(metadata.validation_status),
                    errors,
                ],
            )?;
            Ok(if inserted == 0 { IngestionOutcome::Duplicate } else { IngestionOutcome::Recorded })
        })
    }

    pub fn is_duplicate_payload(&self, source: &str, checksum: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM ingestion_metadata WHERE source = ?1 AND checksum = ?2",
                params![source, checksum],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn insert_run_history(&self, run: &RunHistory) -> Result<i64> {
        self.with_conn(|conn| {
            let result_data = crate::json::sanitize(&run.result_data).to_string();
            let errors = serde_json::to_string(&run.errors)?;
            conn.execute(
                "INSERT INTO run_history
                    (run_type, domain, started_at, completed_at, success, stopped,
                     skip_reason, result_data, errors)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    run.run_type,
                    run.domain.as_str(),
                    run.started_at,
                    run.completed_at,
                    run.success,
                    run.stopped,
                    run.skip_reason,
                    result_data,
                    errors,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Most recent ingestion attempts for `source`, newest first.
    pub fn recent_ingestion(&self, source: &str, limit: u32) -> Result<Vec<IngestionMetadata>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, source, ingested_at, records_count, checksum, validation_status,
                        errors, dismissed
                 FROM ingestion_metadata WHERE source = ?1 ORDER BY ingested_at DESC LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![source, limit], row_to_ingestion_metadata)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn dismiss_ingestion_error(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE ingestion_metadata SET dismissed = 1 WHERE id = ?1",
                params![id],
            )?;
            Ok(rows > 0)
        })
    }

    pub fn recent_run_history(&self, run_type: &str, limit: u32) -> Result<Vec<RunHistory>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, run_type, domain, started_at, completed_at, success, stopped,
                        skip_reason, result_data, errors
                 FROM run_history WHERE run_type = ?1 ORDER BY started_at DESC LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![run_type, limit], row_to_run_history)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

/// Result of [`Store::record_ingestion`] — distinguishes a fresh row from a
/// replayed payload without the caller re-deriving it from a row count.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IngestionOutcome {
    Recorded,
    Duplicate,
}

const fn status_str(status: ValidationStatus) -> &'static str {
    match status {
        ValidationStatus::Success => "success",
        ValidationStatus::ValidationFailed => "validation_failed",
        ValidationStatus::Error => "error",
        ValidationStatus::Duplicate => "duplicate",
    }
}

fn status_from_str(s: &str) -> ValidationStatus {
    match s {
        "success" => ValidationStatus::Success,
        "validation_failed" => ValidationStatus::ValidationFailed,
        "duplicate" => ValidationStatus::Duplicate,
        _ => ValidationStatus::Error,
    }
}

fn row_to_ingestion_metadata(row: &rusqlite::Row<'_>) -> rusqlite::Result<IngestionMetadata> {
    let status: String = row.get(5)?;
    let errors: String = row.get(6)?;
    Ok(IngestionMetadata {
        id: row.get(0)?,
        source: row.get(1)?,
        ingested_at: row.get(2)?,
        records_count: row.get(3)?,
        checksum: row.get(4)?,
        validation_status: status_from_str(&status),
        errors: serde_json::from_str(&errors).unwrap_or_default(),
        dismissed: row.get(7)?,
    })
}

fn row_to_run_history(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunHistory> {
    let domain: String = row.get(2)?;
    let result_data: String = row.get(8)?;
    let errors: String = row.get(9)?;
    Ok(RunHistory {
        id: row.get(0)?,
        run_type: row.get(1)?,
        domain: Domain::from_str(&domain).unwrap_or(Domain::Betting),
        started_at: row.get(3)?,
        completed_at: row.get(4)?,
        success: row.get(5)?,
        stopped: row.get(6)?,
        skip_reason: row.get(7)?,
        result_data: serde_json::from_str(&result_data).unwrap_or(serde_json::Value::Null),
        errors: serde_json::from_str(&errors).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn metadata(source: &str, checksum: &str) -> IngestionMetadata {
        IngestionMetadata {
            id: None,
            source: source.into(),
            ingested_at: Utc::now(),
            records_count: 10,
            checksum: checksum.into(),
            validation_status: ValidationStatus::Success,
            errors: Vec::new(),
            dismissed: false,
        }
    }

    #[test]
    fn duplicate_checksum_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.record_ingestion(&metadata("betano", "abc")).unwrap(), IngestionOutcome::Recorded);
        assert_eq!(store.record_ingestion(&metadata("betano", "abc")).unwrap(), IngestionOutcome::Duplicate);
        assert!(store.is_duplicate_payload("betano", "abc").unwrap());
    }

    #[test]
    fn same_checksum_different_source_is_not_a_duplicate() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.record_ingestion(&metadata("betano", "abc")).unwrap(), IngestionOutcome::Recorded);
        assert_eq!(store.record_ingestion(&metadata("flashscore", "abc")).unwrap(), IngestionOutcome::Recorded);
    }

    #[test]
    fn run_history_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let run = RunHistory {
            id: None,
            run_type: "collection".into(),
            domain: Domain::Betting,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            success: true,
            stopped: false,
            skip_reason: None,
            result_data: json!({"leagues": 5}),
            errors: Vec::new(),
        };
        store.insert_run_history(&run).unwrap();

        let history = store.recent_run_history("collection", 10).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].success);
    }
}
