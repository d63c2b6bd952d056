//! MIME message generation.

use crate::content_type::{Boundary, ContentDisposition, ContentType};
use crate::encoding::encode_base64_lines;
use crate::error::Result;
use crate::header::{Headers, format_mailbox};
use chrono::{DateTime, FixedOffset, Local};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Default subject line.
pub const DEFAULT_SUBJECT: &str = "Send to Kindle";

/// Default plain-text notice placed before the attachment.
pub const DEFAULT_NOTICE: &str = "Please deliver the attached file to my Kindle, thanks!";

/// Transfer encoding of both body parts.
const TRANSFER_ENCODING: &str = "base64";

/// A fully formed RFC 5322 message, ready for SMTP `DATA`.
///
/// Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct MailMessage {
    bytes: Vec<u8>,
}

impl MailMessage {
    /// Returns the message bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the message size in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the message has no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consumes the message, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for MailMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailMessage")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Writes `multipart/*` bodies: delimiters, part headers and the close
/// delimiter.
#[derive(Debug)]
pub struct MultipartWriter<W> {
    writer: W,
    boundary: Boundary,
    parts: usize,
}

impl<W: Write> MultipartWriter<W> {
    /// Creates a writer that separates parts with `boundary`.
    pub const fn new(writer: W, boundary: Boundary) -> Self {
        Self {
            writer,
            boundary,
            parts: 0,
        }
    }

    /// Writes the delimiter and headers of the next part and returns the
    /// underlying writer for the part body.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn begin_part(&mut self, headers: &Headers) -> io::Result<&mut W> {
        if self.parts > 0 {
            self.writer.write_all(b"\r\n")?;
        }
        write!(self.writer, "--{}\r\n", self.boundary)?;
        self.writer.write_all(headers.to_wire().as_bytes())?;
        self.parts += 1;
        Ok(&mut self.writer)
    }

    /// Writes the close delimiter and returns the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn finish(mut self) -> io::Result<W> {
        write!(self.writer, "\r\n--{}--\r\n", self.boundary)?;
        Ok(self.writer)
    }
}

/// Builds `multipart/mixed` messages carrying one file attachment.
///
/// The message has exactly two parts: a short Base64-encoded text notice and
/// the attachment itself as Base64-encoded `application/octet-stream`.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    boundary: Boundary,
    from: String,
    to: String,
    subject: String,
    notice: String,
    date: Option<DateTime<FixedOffset>>,
}

impl MessageBuilder {
    /// Creates a builder using `boundary` as the multipart delimiter.
    #[must_use]
    pub fn new(boundary: Boundary) -> Self {
        Self {
            boundary,
            from: String::new(),
            to: String::new(),
            subject: DEFAULT_SUBJECT.to_string(),
            notice: DEFAULT_NOTICE.to_string(),
            date: None,
        }
    }

    /// Sets the `From` mailbox.
    #[must_use]
    pub fn from(mut self, name: Option<&str>, address: &str) -> Self {
        self.from = format_mailbox(name, address);
        self
    }

    /// Sets the `To` mailbox.
    #[must_use]
    pub fn to(mut self, name: Option<&str>, address: &str) -> Self {
        self.to = format_mailbox(name, address);
        self
    }

    /// Sets the subject line.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the plain-text notice.
    #[must_use]
    pub fn notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = notice.into();
        self
    }

    /// Pins the `Date` header instead of using the current local time.
    #[must_use]
    pub const fn date(mut self, date: DateTime<FixedOffset>) -> Self {
        self.date = Some(date);
        self
    }

    /// Builds a message attaching the file at `path`.
    ///
    /// The attachment is named after the file's final path component.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read.
    pub fn build(&self, path: &Path) -> Result<MailMessage> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = File::open(path)?;
        self.build_from_reader(&filename, file)
    }

    /// Builds a message whose attachment content is read from `reader`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the attachment fails.
    pub fn build_from_reader<R: Read>(&self, filename: &str, reader: R) -> Result<MailMessage> {
        let mut out = Vec::new();
        out.extend_from_slice(self.headers().to_wire().as_bytes());

        let mut multipart = MultipartWriter::new(out, self.boundary.clone());

        let mut text_headers = Headers::new();
        text_headers.add("Content-Type", ContentType::text_plain().to_string());
        text_headers.add("Content-Transfer-Encoding", TRANSFER_ENCODING);
        let body = multipart.begin_part(&text_headers)?;
        encode_base64_lines(self.notice.as_bytes(), body)?;

        let mut file_headers = Headers::new();
        file_headers.add("Content-Type", ContentType::octet_stream().to_string());
        file_headers.add("Content-Transfer-Encoding", TRANSFER_ENCODING);
        file_headers.add(
            "Content-Disposition",
            ContentDisposition::attachment(filename).to_string(),
        );
        let body = multipart.begin_part(&file_headers)?;
        encode_base64_lines(reader, body)?;

        let bytes = multipart.finish()?;
        Ok(MailMessage { bytes })
    }

    fn headers(&self) -> Headers {
        let date = self
            .date
            .unwrap_or_else(|| Local::now().fixed_offset())
            .to_rfc2822();

        let mut headers = Headers::new();
        headers.add("To", self.to.clone());
        headers.add("From", self.from.clone());
        headers.add("Subject", self.subject.clone());
        headers.add("Date", date);
        headers.add("MIME-Version", "1.0");
        headers.add(
            "Content-Type",
            ContentType::multipart_mixed(&self.boundary).to_string(),
        );
        headers
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
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    fn builder() -> MessageBuilder {
        MessageBuilder::new(Boundary::new("kindlemail-test-boundary").unwrap())
            .from(Some("Reader"), "reader@example.com")
            .to(Some("Kindle"), "reader@kindle.com")
            .subject("Send to Kindle")
            .notice("Please send this file to my Kindle.")
            .date(DateTime::parse_from_rfc2822("Mon, 19 Oct 2026 08:00:00 +0800").unwrap())
    }

    fn text(message: &MailMessage) -> String {
        String::from_utf8(message.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_header_block() {
        let message = builder().build_from_reader("book.pdf", &b"%PDF"[..]).unwrap();
        let text = text(&message);
        let (head, _) = text.split_once("\r\n\r\n").unwrap();
        assert_eq!(
            head,
            concat!(
                "To: Kindle <reader@kindle.com>\r\n",
                "From: Reader <reader@example.com>\r\n",
                "Subject: Send to Kindle\r\n",
                "Date: Mon, 19 Oct 2026 08:00:00 +0800\r\n",
                "MIME-Version: 1.0\r\n",
                "Content-Type: multipart/mixed; boundary=kindlemail-test-boundary"
            )
        );
    }

    #[test]
    fn test_non_ascii_subject_is_encoded() {
        let message = builder()
            .subject("推送到 Kindle")
            .build_from_reader("a.txt", &b"x"[..])
            .unwrap();
        let text = text(&message);
        assert!(text.contains("Subject: =?UTF-8?Q?"));
        assert!(!text.contains("推送"));
    }

    #[test]
    fn test_two_parts_and_close_delimiter() {
        let message = builder().build_from_reader("book.pdf", &b"%PDF-1.7"[..]).unwrap();
        let text = text(&message);

        assert_eq!(text.matches("--kindlemail-test-boundary\r\n").count(), 2);
        assert!(text.ends_with("\r\n--kindlemail-test-boundary--\r\n"));
        assert!(text.contains(
            "Content-Disposition: attachment; filename*=UTF-8''book.pdf\r\n"
        ));
        assert!(text.contains("Content-Type: application/octet-stream\r\n"));
        assert!(text.contains("Content-Type: text/plain; charset=UTF-8\r\n"));
    }

    #[test]
    fn test_parts_decode_to_source() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let message = builder().build_from_reader("blob.bin", payload.as_slice()).unwrap();
        let text = text(&message);

        let parts: Vec<&str> = text.split("--kindlemail-test-boundary").collect();
        // preamble, notice, attachment, closing "--"
        assert_eq!(parts.len(), 4);

        let decode = |part: &str| {
            let (_, body) = part.split_once("\r\n\r\n").unwrap();
            let joined: String = body.split("\r\n").collect();
            STANDARD.decode(&joined).unwrap()
        };
        assert_eq!(decode(parts[1]), b"Please send this file to my Kindle.");
        assert_eq!(decode(parts[2]), payload);
    }

    #[test]
    fn test_empty_attachment() {
        let message = builder().build_from_reader("empty.txt", &b""[..]).unwrap();
        let text = text(&message);
        assert!(text.contains(
            "filename*=UTF-8''empty.txt\r\n\r\n\r\n--kindlemail-test-boundary--\r\n"
        ));
    }

    #[test]
    fn test_build_missing_file() {
        let result = builder().build(Path::new("/definitely/not/here.pdf"));
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }

    #[test]
    fn test_mail_message_accessors() {
        let message = builder().build_from_reader("a.pdf", &b"1"[..]).unwrap();
        assert_eq!(message.len(), message.as_bytes().len());
        assert!(!message.is_empty());
        assert!(format!("{message:?}").starts_with("MailMessage"));
        let len = message.len();
        assert_eq!(message.into_bytes().len(), len);
    }
}
