//! MIME header handling.

use crate::encoding::encode_word;
use std::fmt;

/// Fields whose values are structured and written verbatim.
const VERBATIM_FIELDS: [&str; 2] = ["content-type", "content-disposition"];

/// Ordered collection of header fields.
///
/// Fields keep their insertion order on output. Field names compare
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the number of fields.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields are present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Renders the header block as it goes on the wire.
    ///
    /// Values of `Content-Type` and `Content-Disposition` are written as-is;
    /// every other value passes through [`encode_word`]. Each field ends
    /// with CRLF, followed by the blank line that closes the block.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.fields {
            out.push_str(name);
            out.push_str(": ");
            if VERBATIM_FIELDS
                .iter()
                .any(|field| name.eq_ignore_ascii_case(field))
            {
                out.push_str(value);
            } else {
                out.push_str(&encode_word(value));
            }
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

/// Formats an address field value: `display-name <addr>` or a bare address.
///
/// Only the display name is encoded-word transformed so the angle-bracket
/// address stays machine readable.
#[must_use]
pub fn format_mailbox(name: Option<&str>, address: &str) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("{} <{address}>", encode_word(name)),
        None => format!("<{address}>"),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_keep_insertion_order() {
        let mut headers = Headers::new();
        headers.add("To", "a");
        headers.add("From", "b");
        headers.add("Subject", "c");
        let names: Vec<_> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["To", "From", "Subject"]);
    }

    #[test]
    fn test_to_wire_encodes_except_structured_fields() {
        let mut headers = Headers::new();
        headers.add("Subject", "Héllo");
        headers.add("Content-Type", "multipart/mixed; boundary=é");
        headers.add("Content-Disposition", "attachment; filename*=UTF-8''%C3%A9");

        assert_eq!(
            headers.to_wire(),
            concat!(
                "Subject: =?UTF-8?Q?H=C3=A9llo?=\r\n",
                "Content-Type: multipart/mixed; boundary=é\r\n",
                "Content-Disposition: attachment; filename*=UTF-8''%C3%A9\r\n",
                "\r\n"
            )
        );
    }

    #[test]
    fn test_to_wire_empty() {
        assert_eq!(Headers::new().to_wire(), "\r\n");
    }

    #[test]
    fn test_format_mailbox() {
        assert_eq!(
            format_mailbox(Some("Kindle"), "me@kindle.com"),
            "Kindle <me@kindle.com>"
        );
        assert_eq!(format_mailbox(None, "me@kindle.com"), "<me@kindle.com>");
        assert_eq!(format_mailbox(Some("  "), "me@kindle.com"), "<me@kindle.com>");
        assert_eq!(
            format_mailbox(Some("阅读"), "me@kindle.com"),
            "=?UTF-8?Q?=E9=98=85=E8=AF=BB?= <me@kindle.com>"
        );
    }

    #[test]
    fn test_headers_display() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");
        headers.add("To", "recipient@example.com");

        let s = headers.to_string();
        assert!(s.contains("From: sender@example.com"));
        assert!(s.contains("To: recipient@example.com"));
    }
}
