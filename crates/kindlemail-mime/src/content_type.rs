//! MIME content type, disposition and boundary handling.

use crate::encoding::{encode_ext_value, needs_encoding};
use crate::error::{Error, Result};
use std::fmt;

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "application", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "octet-stream", "mixed").
    pub sub_type: String,
    /// Parameters in output order (e.g., charset=UTF-8, boundary=xxx).
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Creates a text/plain content type in UTF-8.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "UTF-8")
    }

    /// Creates an application/octet-stream content type.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: &Boundary) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary.as_str())
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        for (key, value) in &self.parameters {
            // Quote value if it contains special characters
            if value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c)) {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}

/// `Content-Disposition: attachment` with an RFC 2231 encoded filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    filename: String,
}

impl ContentDisposition {
    /// Creates an attachment disposition for `filename`.
    #[must_use]
    pub fn attachment(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }

    /// Returns the unencoded filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attachment; filename*=UTF-8''{}",
            encode_ext_value(&self.filename)
        )
    }
}

/// Maximum boundary length allowed by RFC 2046.
const MAX_BOUNDARY_LEN: usize = 70;

/// Multipart boundary token, validated against RFC 2046 `bchars`.
///
/// Parts produced by this crate are Base64 encoded, and the Base64 alphabet
/// never starts a line with `--`, so a valid boundary cannot collide with
/// part content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary(String);

impl Boundary {
    /// Validates and wraps a boundary token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBoundary`] if the token is empty, longer than
    /// 70 characters, ends with a space, or contains characters outside the
    /// RFC 2046 boundary alphabet.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let reason = if token.is_empty() {
            Some("boundary is empty")
        } else if token.len() > MAX_BOUNDARY_LEN {
            Some("boundary is longer than 70 characters")
        } else if token.ends_with(' ') {
            Some("boundary ends with a space")
        } else if needs_encoding(&token) || !token.bytes().all(is_bchar) {
            Some("boundary contains characters outside the RFC 2046 alphabet")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(Error::InvalidBoundary {
                boundary: token,
                reason,
            }),
            None => Ok(Self(token)),
        }
    }

    /// Returns the token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const fn is_bchar(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'\'' | b'(' | b')' | b'+' | b'_' | b',' | b'-' | b'.' | b'/' | b':' | b'=' | b'?' | b' '
        )
}
