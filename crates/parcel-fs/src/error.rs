//! Error types for storage backends.

use thiserror::Error;

/// Errors from source and sink operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// The path would escape the backend root or is otherwise unusable.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed while listing documents.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The backend lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

impl FsError {
    pub(crate) fn io(path: &str, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}

/// Result alias for storage operations.
pub type FsResult<T> = Result<T, FsError>;
