use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid tle format")]
    InvalidTleFormat,
    #[error("invalid tle: {0}")]
    InvalidTle(String),
    #[error("invalid tle epoch field: {0:?}")]
    InvalidEpoch(String),
    #[error("satellite not in catalog: {0}")]
    NotFound(String),
    #[error("cache file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache format error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<sgp4::TleError> for CatalogError {
    fn from(err: sgp4::TleError) -> Self {
        CatalogError::InvalidTle(err.to_string())
    }
}
