use thiserror::Error;

pub type Result<T> = std::result::Result<T, CubeError>;

#[derive(Debug, Error)]
pub enum CubeError {
    #[error("invalid granularity: {0}")]
    InvalidGranularity(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] duckdb::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CubeError {
    /// Storage-side failures degrade to empty results instead of propagating.
    pub fn is_storage(&self) -> bool {
        match self {
            CubeError::Storage(_) | CubeError::Decode(_) => true,
            #[cfg(feature = "duckdb")]
            CubeError::DuckDb(_) => true,
            _ => false,
        }
    }
}
