use thiserror::Error;

/// Errors surfaced by the scheduler itself. Every leaf crate's own error
/// type already describes its failure in detail; task bodies mostly catch
/// those and fold them into a [`crate::task::TaskResult`]'s `errors` list
/// rather than propagating (§7), so this enum is only reached by the few
/// operations a task can't recover from internally (pre-training backup,
/// background-worker joins).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("store error: {0}")]
    Store(#[from] arbihawk_store::StoreError),
    #[error("ingest error: {0}")]
    Ingest(#[from] arbihawk_ingest::IngestError),
    #[error("matcher error: {0}")]
    Matcher(#[from] arbihawk_matcher::MatcherError),
    #[error("settlement error: {0}")]
    Settlement(#[from] arbihawk_settlement::SettlementError),
    #[error("models error: {0}")]
    Models(#[from] arbihawk_models::ModelsError),
    #[error("strategies error: {0}")]
    Strategies(#[from] arbihawk_strategies::StrategiesError),
    #[error("background task join error: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for CoreError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Join(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
