use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelsError {
    #[error("store error: {0}")]
    Store(#[from] arbihawk_store::StoreError),
    #[error("model version {0} does not exist")]
    VersionNotFound(String),
}

pub type Result<T> = std::result::Result<T, ModelsError>;
