use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("store error: {0}")]
    Store(#[from] arbihawk_store::StoreError),
}

pub type Result<T> = std::result::Result<T, SettlementError>;
