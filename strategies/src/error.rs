use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategiesError {
    #[error("store error: {0}")]
    Store(#[from] arbihawk_store::StoreError),
    #[error("risk error: {0}")]
    Risk(#[from] arbihawk_risk::RiskError),
}

pub type Result<T> = std::result::Result<T, StrategiesError>;
