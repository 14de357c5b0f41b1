// Error types shared by the library. The binary wraps these in `anyhow`
// and adds context; the library itself keeps them typed so callers can
// match on `NotFound` or `AlreadyExists`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while talking to the data store or walking local files.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A credential was neither passed explicitly nor set in the environment.
    #[error("required argument absent: {0}")]
    MissingCredential(&'static str),

    /// A path could not be used (empty remote path, non UTF-8 file name).
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Remote collection or data object does not exist.
    #[error("remote path not found: {0}")]
    NotFound(String),

    /// Local file or directory does not exist.
    #[error("file/directory {} not found", .0.display())]
    LocalNotFound(PathBuf),

    /// Remote collection or data object already exists.
    #[error("remote path already exists: {0}")]
    AlreadyExists(String),

    /// An access entry could not be parsed.
    #[error("invalid access entry '{0}', expected <null|read|write|own>:<user>[#zone]")]
    InvalidAcl(String),

    /// The HTTP API answered with a non-zero iRODS status code.
    #[error("iRODS error {status_code}: {message}")]
    Api { status_code: i64, message: String },

    /// Network request error.
    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local filesystem error.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Wrap an `std::io::Error` with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, StorageError>;
