use thiserror::Error;

use super::snapshot::SnapshotError;
use super::store::StoreError;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("flash file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("flash file format error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("non-volatile store error: {0}")]
    Store(#[from] StoreError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}
