use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("odds must be greater than 1.0, got {0}")]
    InvalidOdds(f64),
    #[error("entry price must be positive, got {0}")]
    InvalidEntry(f64),
}

pub type Result<T> = std::result::Result<T, RiskError>;
