//! Error types for the core library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error with the associated file path.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Text detected as GBK could not be transcoded.
    #[error("'{}' is not valid GBK text", path.display())]
    Undecodable {
        /// Source file.
        path: PathBuf,
    },

    /// Message could not be built.
    #[error("Failed to build message for '{}': {source}", path.display())]
    Build {
        /// Attachment file.
        path: PathBuf,
        /// Underlying error.
        source: kindlemail_mime::Error,
    },

    /// SMTP operation failed.
    #[error("SMTP error: {0}")]
    Smtp(#[from] kindlemail_smtp::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A background worker stopped without reporting.
    #[error("Worker error: {0}")]
    Worker(String),
}

impl Error {
    /// Creates an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_path() {
        let err = Error::io(
            "/books/a.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert_eq!(err.to_string(), "I/O error on '/books/a.txt': not found");

        let err = Error::Undecodable {
            path: PathBuf::from("b.txt"),
        };
        assert_eq!(err.to_string(), "'b.txt' is not valid GBK text");
    }

    #[test]
    fn test_smtp_conversion() {
        let err: Error = kindlemail_smtp::Error::smtp_error(535, "bad login").into();
        assert_eq!(err.to_string(), "SMTP error: SMTP error 535: bad login");
    }
}
