//! # kindlemail-mime
//!
//! MIME message generation for delivering files by email.
//!
//! ## Features
//!
//! - **Line-wrapped Base64**: streaming RFC 2045 body encoding, 76 characters
//!   per line, one chunk in memory at a time
//! - **Header encoding**: RFC 2047 encoded-words for non-ASCII header values
//! - **Attachment names**: RFC 2231 `filename*` parameters
//! - **Multipart**: `multipart/mixed` with a text notice and one attachment
//!
//! ## Quick Start
//!
//! ```ignore
//! use kindlemail_mime::{Boundary, MessageBuilder};
//! use std::path::Path;
//!
//! let message = MessageBuilder::new(Boundary::new("kindlemail-boundary")?)
//!     .from(Some("Me"), "me@example.com")
//!     .to(Some("Kindle"), "me@kindle.com")
//!     .subject("Send to Kindle")
//!     .build(Path::new("book.epub"))?;
//!
//! println!("{} bytes", message.len());
//! ```
//!
//! ### Encoding
//!
//! ```ignore
//! use kindlemail_mime::encoding::{encode_base64_lines, encode_word};
//!
//! let mut out = Vec::new();
//! encode_base64_lines(&b"Hello, World!"[..], &mut out)?;
//! assert_eq!(out, b"SGVsbG8sIFdvcmxkIQ==\r\n");
//!
//! assert_eq!(encode_word("Héllo"), "=?UTF-8?Q?H=C3=A9llo?=");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use content_type::{Boundary, ContentDisposition, ContentType};
pub use error::{Error, Result};
pub use header::{Headers, format_mailbox};
pub use message::{DEFAULT_NOTICE, DEFAULT_SUBJECT, MailMessage, MessageBuilder, MultipartWriter};
