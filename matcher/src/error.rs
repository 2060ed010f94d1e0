use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("store error: {0}")]
    Store(#[from] arbihawk_store::StoreError),

    #[error("unparseable match time: {0}")]
    InvalidMatchTime(String),
}

pub type Result<T> = std::result::Result<T, MatcherError>;
