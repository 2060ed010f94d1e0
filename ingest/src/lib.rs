#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! # Ingest
//!
//! The subprocess-driven scraper ingestion pipeline (§4.3, §6): spawn a
//! scraper, classify and extract its JSON payload, validate that payload's
//! shape, and dispatch it into the Store. Checksums every attempt so a
//! byte-identical re-scrape is recorded but never re-written.

mod ansi;
mod dispatch;
pub mod error;
mod json_extract;
mod log_line;
mod subprocess;

pub use error::{IngestError, Result};
pub use log_line::LogLevel;
pub use subprocess::{run_subprocess, LogCallback, SubprocessOutcome};

use arbihawk_instrument::{AssetType, IngestionMetadata, ValidationStatus};
use arbihawk_markets::SourceKind;
use arbihawk_matcher::Matcher;
use arbihawk_store::Store;
use chrono::Utc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Outcome of one full ingestion run (§4.3, §7), regardless of which stage
/// it stopped at.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionResult {
    pub success: bool,
    pub stopped: bool,
    pub skipped: bool,
    pub errors: Vec<String>,
    pub records: u64,
}

impl IngestionResult {
    fn skipped_duplicate() -> Self {
        Self { success: true, stopped: false, skipped: true, errors: Vec::new(), records: 0 }
    }

    fn failed(errors: Vec<String>) -> Self {
        Self { success: false, stopped: false, skipped: false, errors, records: 0 }
    }

    fn stopped() -> Self {
        Self { success: false, stopped: true, skipped: false, errors: Vec::new(), records: 0 }
    }
}

/// Runs `command`, validates and dispatches its payload for `source`, and
/// records the attempt in the ingestion log (§4.3 end-to-end contract).
///
/// `asset_type` is only consulted for [`SourceKind::Stocks`]/[`SourceKind::Crypto`].
pub async fn run_and_ingest(
    store: &Store,
    source: SourceKind,
    command: &[String],
    timeout: Duration,
    cancellation: CancellationToken,
    asset_type: AssetType,
) -> Result<IngestionResult> {
    let outcome = run_subprocess(command, timeout, cancellation, &|level, message| match level {
        LogLevel::Error => warn!(source = source.as_str(), "{message}"),
        _ => info!(source = source.as_str(), "{message}"),
    })
    .await?;

    let payload = match outcome {
        SubprocessOutcome::Success { payload } => payload,
        SubprocessOutcome::NoPayload => {
            return Ok(record_and_return(
                store,
                source,
                &[],
                ValidationStatus::Error,
                vec!["scraper produced no extractable payload".to_string()],
                IngestionResult::failed(vec!["no payload captured".to_string()]),
            )?)
        }
        SubprocessOutcome::Failed { exit_code, tail } => {
            let message = format!("scraper exited with {exit_code:?}: {}", tail.join(" | "));
            return Ok(record_and_return(
                store,
                source,
                &[],
                ValidationStatus::Error,
                vec![message.clone()],
                IngestionResult::failed(vec![message]),
            )?);
        }
        SubprocessOutcome::TimedOut => {
            return Ok(record_and_return(
                store,
                source,
                &[],
                ValidationStatus::Error,
                vec!["scraper timed out".to_string()],
                IngestionResult::failed(vec!["timed out".to_string()]),
            )?)
        }
        SubprocessOutcome::Stopped => return Ok(IngestionResult::stopped()),
    };

    ingest_payload(store, source, &payload, asset_type)
}

/// Validates and dispatches an already-captured `payload` (§4.3). Split out
/// from [`run_and_ingest`] so tests and alternate transports (e.g. a direct
/// HTTP feed) can skip the subprocess boundary.
pub fn ingest_payload(
    store: &Store,
    source: SourceKind,
    payload: &serde_json::Value,
    asset_type: AssetType,
) -> Result<IngestionResult> {
    let raw = serde_json::to_vec(payload)?;
    let checksum = blake3::hash(&raw).to_hex().to_string();

    if store.is_duplicate_payload(source.as_str(), &checksum)? {
        record(store, source, &checksum, 0, ValidationStatus::Duplicate, Vec::new())?;
        return Ok(IngestionResult::skipped_duplicate());
    }

    let report = arbihawk_validate::validate(source, payload);
    if !report.valid {
        record(store, source, &checksum, 0, ValidationStatus::ValidationFailed, report.errors.clone())?;
        return Ok(IngestionResult::failed(report.errors));
    }

    let records = match source {
        SourceKind::Betano => dispatch::ingest_betano(store, payload)?,
        SourceKind::Flashscore | SourceKind::Livescore => {
            let matcher = Matcher::new(store);
            dispatch::ingest_match_scores(store, &matcher, payload, source)?
        }
        SourceKind::Stocks | SourceKind::Crypto => dispatch::ingest_price_bars(store, payload, asset_type)?,
    };

    record(store, source, &checksum, records, ValidationStatus::Success, Vec::new())?;
    Ok(IngestionResult { success: true, stopped: false, skipped: false, errors: Vec::new(), records })
}

fn record(
    store: &Store,
    source: SourceKind,
    checksum: &str,
    records: u64,
    status: ValidationStatus,
    errors: Vec<String>,
) -> Result<()> {
    store.record_ingestion(&IngestionMetadata {
        id: None,
        source: source.as_str().to_string(),
        ingested_at: Utc::now(),
        records_count: records,
        checksum: checksum.to_string(),
        validation_status: status,
        errors,
        dismissed: false,
    })?;
    Ok(())
}

fn record_and_return(
    store: &Store,
    source: SourceKind,
    _payload: &[u8],
    status: ValidationStatus,
    errors: Vec<String>,
    result: IngestionResult,
) -> Result<IngestionResult> {
    record(store, source, "", 0, status, errors)?;
    Ok(result)
}
