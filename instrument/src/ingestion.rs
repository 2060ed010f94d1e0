use arbihawk_markets::Domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of validating one ingested payload against its source's schema
/// (§4.3 Validator).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Success,
    ValidationFailed,
    Error,
    /// Checksum matched a payload already ingested from the same source;
    /// the pipeline skips persistence but still records the attempt.
    Duplicate,
}

/// One audit row per scraper subprocess invocation (§3 `ingestion_log`),
/// written regardless of outcome so a failed or duplicate run is still
/// visible to the Scheduler's run history and to the fuzzy matcher's
/// duplicate-payload check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionMetadata {
    pub id: Option<i64>,
    pub source: String,
    pub ingested_at: DateTime<Utc>,
    pub records_count: u64,
    /// blake3 digest of the raw payload bytes, used to recognise a
    /// byte-identical re-scrape before it reaches the Matcher.
    pub checksum: String,
    pub validation_status: ValidationStatus,
    pub errors: Vec<String>,
    /// Operator acknowledgement flag for a failed/duplicate row (dashboard
    /// concern; out of scope here beyond carrying the column).
    pub dismissed: bool,
}

/// One row per Scheduler task execution (§3 `run_history`, §4.8), covering
/// collection, training, settlement and trading runs alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunHistory {
    pub id: Option<i64>,
    pub run_type: String,
    pub domain: Domain,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub success: bool,
    /// `true` if a cooperative stop request interrupted the run before it
    /// reached its natural end (§4.8 cancellation).
    pub stopped: bool,
    pub skip_reason: Option<String>,
    pub result_data: serde_json::Value,
    pub errors: Vec<String>,
}

impl RunHistory {
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }
}
