//! MIME encoding utilities.
//!
//! Supports line-wrapped Base64 bodies (RFC 2045), RFC 2047 encoded-words for
//! header values and RFC 2231/5987 extended parameter values.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::io::{self, Read, Write};

/// Maximum length of an encoded Base64 body line, excluding CRLF.
pub const MAX_LINE_LENGTH: usize = 76;

/// Raw bytes consumed per Base64 body line (largest multiple of 3 that fits).
pub const RAW_CHUNK_LEN: usize = MAX_LINE_LENGTH / 4 * 3;

/// Maximum length of a single RFC 2047 encoded-word.
const ENCODED_WORD_MAX: usize = 75;

/// Prefix of every encoded-word this module produces.
const Q_WORD_PREFIX: &str = "=?UTF-8?Q?";

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Streams `reader` through Base64, writing one CRLF-terminated line per
/// [`RAW_CHUNK_LEN`] raw bytes.
///
/// Every line except the last encodes exactly [`RAW_CHUNK_LEN`] bytes, so the
/// concatenated lines (terminators removed) decode as one Base64 string.
/// An empty source writes nothing. Each line is handed to `writer` as soon as
/// it is encoded; at most one chunk is held in memory.
///
/// Returns the number of raw bytes consumed.
///
/// # Errors
///
/// Propagates any read error from `reader` and any write error from `writer`.
pub fn encode_base64_lines<R: Read, W: Write>(mut reader: R, mut writer: W) -> io::Result<u64> {
    let mut raw = [0u8; RAW_CHUNK_LEN];
    let mut line = [0u8; MAX_LINE_LENGTH + 2];
    let mut total = 0u64;

    loop {
        let n = fill_chunk(&mut reader, &mut raw)?;
        if n == 0 {
            return Ok(total);
        }

        let encoded = STANDARD
            .encode_slice(&raw[..n], &mut line)
            .map_err(io::Error::other)?;
        line[encoded..encoded + 2].copy_from_slice(b"\r\n");
        writer.write_all(&line[..encoded + 2])?;
        total += n as u64;

        if n < RAW_CHUNK_LEN {
            return Ok(total);
        }
    }
}

/// Reads until `buf` is full or the source is exhausted.
fn fill_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Returns true if a header value cannot be sent verbatim.
#[must_use]
pub fn needs_encoding(text: &str) -> bool {
    text.bytes().any(|b| (b < b' ' || b > b'~') && b != b'\t')
}

/// Encodes a header value as RFC 2047 `Q` encoded-words in UTF-8.
///
/// Values made only of printable ASCII are returned unchanged. Longer values
/// are split into several space-separated encoded-words, each at most 75
/// characters long, never splitting a character.
#[must_use]
pub fn encode_word(text: &str) -> String {
    if !needs_encoding(text) {
        return text.to_string();
    }

    let max_payload = ENCODED_WORD_MAX - Q_WORD_PREFIX.len() - "?=".len();
    let mut out = String::new();
    let mut word = String::new();
    let mut utf8 = [0u8; 4];

    for ch in text.chars() {
        let encoded = q_encode(ch.encode_utf8(&mut utf8).as_bytes());
        if !word.is_empty() && word.len() + encoded.len() > max_payload {
            push_word(&mut out, &word);
            word.clear();
        }
        word.push_str(&encoded);
    }
    push_word(&mut out, &word);

    out
}

fn push_word(out: &mut String, payload: &str) {
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(Q_WORD_PREFIX);
    out.push_str(payload);
    out.push_str("?=");
}

fn q_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for &b in bytes {
        match b {
            b' ' => out.push('_'),
            b'!'..=b'~' if b != b'=' && b != b'?' && b != b'_' => out.push(char::from(b)),
            _ => push_hex(&mut out, '=', b),
        }
    }
    out
}

/// Percent-encodes a value for an RFC 2231 extended parameter
/// (`name*=UTF-8''<value>`).
///
/// Bytes outside the RFC 5987 `attr-char` set are escaped as `%XX`.
#[must_use]
pub fn encode_ext_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        if is_attr_char(b) {
            out.push(char::from(b));
        } else {
            push_hex(&mut out, '%', b);
        }
    }
    out
}

const fn is_attr_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        )
}

fn push_hex(out: &mut String, marker: char, b: u8) {
    out.push(marker);
    out.push(char::from(HEX_UPPER[usize::from(b >> 4)]));
    out.push(char::from(HEX_UPPER[usize::from(b & 0x0f)]));
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
    use proptest::prelude::*;

    fn encode_lines(data: &[u8]) -> String {
        let mut out = Vec::new();
        encode_base64_lines(data, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_raw_chunk_len() {
        assert_eq!(RAW_CHUNK_LEN, 57);
        assert_eq!(STANDARD.encode([0u8; RAW_CHUNK_LEN]).len(), MAX_LINE_LENGTH);
    }

    #[test]
    fn test_lines_empty_input_writes_nothing() {
        assert_eq!(encode_lines(b""), "");
    }

    #[test]
    fn test_lines_short_input() {
        assert_eq!(encode_lines(b"Hello, World!"), "SGVsbG8sIFdvcmxkIQ==\r\n");
    }

    #[test]
    fn test_lines_exact_multiple() {
        let data = vec![0xAB; RAW_CHUNK_LEN * 3];
        let out = encode_lines(&data);
        let lines: Vec<&str> = out.split_terminator("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.len() == MAX_LINE_LENGTH));
    }

    #[test]
    fn test_lines_partial_last_line() {
        let data = vec![b'x'; RAW_CHUNK_LEN + 1];
        let out = encode_lines(&data);
        let lines: Vec<&str> = out.split_terminator("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), MAX_LINE_LENGTH);
        assert_eq!(lines[1], "eA==");
    }

    /// Hands out one byte per read call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((first, rest)) if !buf.is_empty() => {
                    buf[0] = *first;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn test_lines_short_reads_fill_whole_chunks() {
        let data = vec![7u8; RAW_CHUNK_LEN * 2];
        let mut out = Vec::new();
        let consumed = encode_base64_lines(Trickle(&data), &mut out).unwrap();
        assert_eq!(consumed, data.len() as u64);
        assert_eq!(out, encode_lines(&data).into_bytes());
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn test_lines_propagates_read_error() {
        let err = encode_base64_lines(Broken, Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    proptest! {
        #[test]
        fn prop_lines_round_trip(data in proptest::collection::vec(any::<u8>(), 1..2048)) {
            let out = encode_lines(&data);
            let joined: String = out.split("\r\n").collect();
            prop_assert_eq!(STANDARD.decode(&joined).unwrap(), data);
        }

        #[test]
        fn prop_lines_never_exceed_limit(data in proptest::collection::vec(any::<u8>(), 0..1024)) {
            let out = encode_lines(&data);
            for line in out.split_terminator("\r\n") {
                prop_assert!(line.len() <= MAX_LINE_LENGTH);
            }
        }
    }

    #[test]
    fn test_encode_word_ascii_unchanged() {
        assert_eq!(encode_word("Send to Kindle"), "Send to Kindle");
        assert_eq!(encode_word("Kindle <me@kindle.com>"), "Kindle <me@kindle.com>");
    }

    #[test]
    fn test_encode_word_non_ascii() {
        assert_eq!(encode_word("Héllo"), "=?UTF-8?Q?H=C3=A9llo?=");
        assert_eq!(encode_word("a b_c?"), "a b_c?");
        assert_eq!(encode_word("é b_c?"), "=?UTF-8?Q?=C3=A9_b=5Fc=3F?=");
    }

    #[test]
    fn test_encode_word_splits_long_values() {
        let text = "推送".repeat(20);
        let encoded = encode_word(&text);
        let words: Vec<&str> = encoded.split(' ').collect();
        assert!(words.len() > 1);
        for word in words {
            assert!(word.len() <= ENCODED_WORD_MAX);
            assert!(word.starts_with(Q_WORD_PREFIX));
            assert!(word.ends_with("?="));
        }
    }

    #[test]
    fn test_encode_ext_value() {
        assert_eq!(encode_ext_value("book.html"), "book.html");
        assert_eq!(encode_ext_value("my book.pdf"), "my%20book.pdf");
        assert_eq!(encode_ext_value("三体.epub"), "%E4%B8%89%E4%BD%93.epub");
        assert_eq!(encode_ext_value("a'b*c%d"), "a%27b%2Ac%25d");
    }
}
