//! Error types for MIME operations.

use std::io;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading a part's source failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Boundary token is not usable as a multipart delimiter.
    #[error("Invalid boundary {boundary:?}: {reason}")]
    InvalidBoundary {
        /// The rejected token.
        boundary: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}
