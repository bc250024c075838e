use std::path::PathBuf;

use thiserror::Error;
use threatscan_core::SourceIdError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid source id: {0}")]
    InvalidSourceId(#[from] SourceIdError),

    #[error("no processed result named {0}")]
    NotFound(String),

    #[error("file name must be a bare name without separators: {0}")]
    InvalidFileName(String),

    #[error("upload already exists: {0}")]
    UploadExists(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("result file {path} is not a verdict list: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
