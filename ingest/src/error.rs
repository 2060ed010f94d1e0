use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("store error: {0}")]
    Store(#[from] arbihawk_store::StoreError),
    #[error("matcher error: {0}")]
    Matcher(#[from] arbihawk_matcher::MatcherError),
    #[error("failed to spawn subprocess: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("failed to serialise ingestion metadata: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;
