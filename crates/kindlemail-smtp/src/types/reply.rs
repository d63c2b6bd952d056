//! SMTP reply types.

use crate::error::{Error, Result};

/// SMTP reply from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code (e.g., 250).
    pub code: ReplyCode,
    /// Reply message lines.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec is not const-compatible
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns true if this is a success reply (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Returns the full message as a single string.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }

    /// Converts the reply into an [`Error::SmtpError`].
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::smtp_error(self.code.as_u16(), self.message_text())
    }

    /// Passes a 2xx reply through, turning anything else into an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SmtpError`] for non-2xx replies.
    pub fn ensure_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }

    /// Passes the reply through only if it carries `code`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SmtpError`] for any other code.
    pub fn ensure_code(self, code: ReplyCode) -> Result<Self> {
        if self.code == code {
            Ok(self)
        } else {
            Err(self.into_error())
        }
    }
}

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true if this is a success code (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Reply codes the client acts on
impl ReplyCode {
    /// 220 Service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Service closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 334 Continue with authentication
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);
    /// 535 Authentication credentials invalid
    pub const AUTH_FAILED: Self = Self(535);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_code_classes() {
        assert!(ReplyCode::OK.is_success());
        assert!(ReplyCode(235).is_success());
        assert!(!ReplyCode::START_DATA.is_success());
        assert!(!ReplyCode::AUTH_FAILED.is_success());
        assert_eq!(format!("{}", ReplyCode::CLOSING), "221");
    }

    #[test]
    fn test_ensure_success() {
        let ok = Reply::new(ReplyCode::OK, vec!["OK".to_string()]);
        assert!(ok.ensure_success().is_ok());

        let rejected = Reply::new(ReplyCode::new(550), vec!["No such user".to_string()]);
        let err = rejected.ensure_success().unwrap_err();
        assert!(err.is_permanent());
        assert_eq!(err.to_string(), "SMTP error 550: No such user");
    }

    #[test]
    fn test_ensure_code() {
        let reply = Reply::new(ReplyCode::START_DATA, vec!["Go ahead".to_string()]);
        assert!(reply.clone().ensure_code(ReplyCode::START_DATA).is_ok());
        assert!(reply.ensure_code(ReplyCode::OK).is_err());
    }

    #[test]
    fn test_message_text_multiple_lines() {
        let reply = Reply::new(
            ReplyCode::SERVICE_READY,
            vec![
                "smtp.example.com ESMTP".to_string(),
                "Ready to serve".to_string(),
            ],
        );
        assert_eq!(
            reply.message_text(),
            "smtp.example.com ESMTP\nReady to serve"
        );
    }
}
