//! Server Error Types

use thiserror::Error;

/// Errors that stop the HTTP server
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bind or accept failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for server operations
pub type ApiResult<T> = Result<T, ApiError>;
