//! Error types for SMTP operations.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Server returned error response.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code (e.g., 550).
        code: u16,
        /// Error message from server.
        message: String,
    },

    /// Protocol error (unexpected response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// TLS setup failed (bad server name or handshake failure).
    #[error("TLS error: {0}")]
    Tls(String),

    /// Message larger than the server's advertised SIZE limit.
    #[error("Message of {size} bytes exceeds server limit of {limit} bytes")]
    MessageTooLarge {
        /// Message size in bytes.
        size: usize,
        /// Advertised limit in bytes.
        limit: usize,
    },

    /// The transport accepted fewer bytes than were offered.
    #[error("Short write: transport accepted {accepted} of {offered} bytes")]
    ShortWrite {
        /// Bytes the transport accepted.
        accepted: usize,
        /// Bytes offered to the transport.
        offered: usize,
    },

    /// Server lacks an extension the operation needs.
    #[error("Server does not support {0}")]
    NotSupported(String),

    /// Invalid state for operation.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),

    /// Session could not be established within the attempt budget.
    #[error("SMTP session not established after {attempts} attempt(s): {source}")]
    Establish {
        /// Attempts made.
        attempts: u32,
        /// Error from the last attempt.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::SmtpError { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns the error that ended the last establishment attempt, or `self`.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Establish { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::smtp_error(535, "bad credentials").is_permanent());
        assert!(!Error::smtp_error(451, "try later").is_permanent());
        assert!(!Error::Protocol("x".into()).is_permanent());
    }

    #[test]
    fn test_root_unwraps_establish() {
        let err = Error::Establish {
            attempts: 3,
            source: Box::new(Error::smtp_error(535, "Authentication failed")),
        };
        assert!(err.root().is_permanent());
        assert_eq!(
            err.to_string(),
            "SMTP session not established after 3 attempt(s): SMTP error 535: Authentication failed"
        );
    }
}
