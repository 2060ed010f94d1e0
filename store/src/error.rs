use thiserror::Error;

/// Errors surfaced by every `arbihawk-store` operation.
///
/// Every other component treats the Store as the sole source of truth
/// (§3 Ownership); a [`StoreError`] therefore propagates unchanged rather
/// than being swallowed or retried by callers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration {version} failed: {reason}")]
    Migration { version: u32, reason: String },

    #[error("json coercion failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("no row found for {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
