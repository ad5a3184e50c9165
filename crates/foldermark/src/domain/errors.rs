//! Domain-specific errors.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("origin document not found: {0}")]
    OriginNotFound(String),
    #[error("invalid folder name '{0}'")]
    InvalidFolderName(String),
    #[error("storage operation failed for {path}")]
    Storage {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl ResolutionError {
    pub(crate) fn storage(path: impl Into<String>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}
