//! SMTP response parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from response lines.
///
/// SMTP replies can be single-line or multi-line:
/// - Single: `250 OK\r\n`
/// - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
///
/// # Errors
///
/// Returns an error if the reply is malformed.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    if lines.is_empty() {
        return Err(Error::Protocol("Empty reply".into()));
    }

    // Parse code from first line
    let first = &lines[0];
    let code_str = first
        .get(0..3)
        .ok_or_else(|| Error::Protocol(format!("Reply too short: {first}")))?;
    let code = code_str
        .parse::<u16>()
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {code_str}")))?;

    let reply_code = ReplyCode::new(code);

    // Extract message from all lines; every line must carry the same code
    let mut message = Vec::new();
    for line in lines {
        if line.get(0..3) != Some(code_str) {
            return Err(Error::Protocol(format!("Inconsistent reply code: {line}")));
        }
        match line.get(3..4) {
            // Just code, no message
            None => message.push(String::new()),
            // Skip code and separator (e.g., "250-" or "250 ")
            Some("-" | " ") => message.push(line.get(4..).unwrap_or_default().to_string()),
            Some(_) => {
                return Err(Error::Protocol(format!("Malformed reply line: {line}")));
            }
        }
    }

    Ok(Reply::new(reply_code, message))
}

/// Checks if a line is the last line of a multi-line reply.
///
/// Multi-line replies use `-` separator for continuation and ` ` for the last line.
/// A bare code (trailing space already trimmed) also ends the reply.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    match line.as_bytes() {
        [_, _, _] => true,
        [_, _, _, sep, ..] => *sep == b' ',
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_line_reply() {
        let lines = vec!["250 OK".to_string()];
        let reply = parse_reply(&lines).unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(reply.message, vec!["OK"]);
        assert!(reply.is_success());
    }

    #[test]
    fn test_parse_ehlo_reply() {
        let lines = vec![
            "250-smtp.example.com Hello".to_string(),
            "250-STARTTLS".to_string(),
            "250 AUTH LOGIN PLAIN".to_string(),
        ];
        let reply = parse_reply(&lines).unwrap();
        assert_eq!(
            reply.message,
            vec!["smtp.example.com Hello", "STARTTLS", "AUTH LOGIN PLAIN"]
        );
    }

    #[test]
    fn test_parse_bare_code() {
        let lines = vec!["354".to_string()];
        let reply = parse_reply(&lines).unwrap();
        assert_eq!(reply.code.as_u16(), 354);
        assert_eq!(reply.message, vec![""]);
    }

    #[test]
    fn test_parse_error_mixed_codes() {
        let lines = vec!["250-First".to_string(), "251 Second".to_string()];
        assert!(parse_reply(&lines).is_err());
    }

    #[test]
    fn test_parse_greeting() {
        let lines = vec!["220 smtp.example.com ESMTP ready".to_string()];
        let reply = parse_reply(&lines).unwrap();
        assert_eq!(reply.code.as_u16(), 220);
        assert_eq!(reply.message, vec!["smtp.example.com ESMTP ready"]);
    }

    #[test]
    fn test_is_last_reply_line() {
        assert!(is_last_reply_line("250 OK"));
        assert!(!is_last_reply_line("250-Continuing"));
        assert!(is_last_reply_line("250"));
        assert!(!is_last_reply_line("25"));
    }

    #[test]
    fn test_parse_error_empty() {
        assert!(parse_reply(&[]).is_err());
    }

    #[test]
    fn test_parse_error_too_short() {
        let lines = vec!["25".to_string()];
        assert!(parse_reply(&lines).is_err());
    }

    #[test]
    fn test_parse_error_invalid_code() {
        let lines = vec!["ABC OK".to_string()];
        assert!(parse_reply(&lines).is_err());
    }
}
