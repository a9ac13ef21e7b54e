use thiserror::Error;

use crate::codec::DecodeError;

#[derive(Error, Debug)]
pub enum DepotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("content hash mismatch for {path}: expected {expected}, got {actual}")]
    ContentHash {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("unsafe path: {0}")]
    UnsafePath(String),

    #[error("no key for depot {0}")]
    MissingKey(u32),

    #[error("Format error: {0}")]
    Format(String),

    #[error("chunk source error: {0}")]
    Source(String),

    #[error("worker pool: {0}")]
    Pool(String),

    #[error("{failed} of {attempted} files failed")]
    Incomplete { failed: usize, attempted: usize },
}

impl From<DepotError> for std::io::Error {
    fn from(e: DepotError) -> Self {
        match e {
            DepotError::Io(inner) => inner,
            other => std::io::Error::other(other),
        }
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, DepotError>;
