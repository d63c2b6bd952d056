//! SMTP command builder.

use crate::types::{Address, AuthMechanism};
use std::fmt;

/// SMTP command.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO - Extended greeting
    Ehlo {
        /// Client identity
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH - Begin authentication
    Auth {
        /// Authentication mechanism
        mechanism: AuthMechanism,
        /// Initial response (optional, for SASL-IR)
        initial_response: Option<String>,
    },
    /// Base64 answer to a 334 challenge
    AuthResponse(String),
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
        /// SIZE parameter
        size: Option<usize>,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// RSET - Reset transaction
    Rset,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Serializes the command to bytes.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Self::Ehlo { hostname } => {
                buf.extend_from_slice(b"EHLO ");
                buf.extend_from_slice(hostname.as_bytes());
            }
            Self::StartTls => {
                buf.extend_from_slice(b"STARTTLS");
            }
            Self::Auth {
                mechanism,
                initial_response,
            } => {
                buf.extend_from_slice(b"AUTH ");
                buf.extend_from_slice(mechanism.as_str().as_bytes());
                if let Some(resp) = initial_response {
                    buf.push(b' ');
                    buf.extend_from_slice(resp.as_bytes());
                }
            }
            Self::AuthResponse(response) => {
                buf.extend_from_slice(response.as_bytes());
            }
            Self::MailFrom { from, size } => {
                buf.extend_from_slice(b"MAIL FROM:<");
                buf.extend_from_slice(from.as_str().as_bytes());
                buf.push(b'>');
                if let Some(msg_size) = size {
                    buf.extend_from_slice(format!(" SIZE={msg_size}").as_bytes());
                }
            }
            Self::RcptTo { to } => {
                buf.extend_from_slice(b"RCPT TO:<");
                buf.extend_from_slice(to.as_str().as_bytes());
                buf.push(b'>');
            }
            Self::Data => {
                buf.extend_from_slice(b"DATA");
            }
            Self::Rset => {
                buf.extend_from_slice(b"RSET");
            }
            Self::Quit => {
                buf.extend_from_slice(b"QUIT");
            }
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }
}

/// Log form of the command; credentials are never shown.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth {
                mechanism,
                initial_response: Some(_),
            } => write!(f, "AUTH {} <redacted>", mechanism.as_str()),
            Self::AuthResponse(_) => f.write_str("<redacted>"),
            other => {
                let line = other.serialize();
                f.write_str(String::from_utf8_lossy(&line).trim_end())
            }
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command({self})")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ehlo_command() {
        let cmd = Command::Ehlo {
            hostname: "client.example.com".to_string(),
        };
        assert_eq!(cmd.serialize(), b"EHLO client.example.com\r\n");
    }

    #[test]
    fn test_starttls_command() {
        assert_eq!(Command::StartTls.serialize(), b"STARTTLS\r\n");
    }

    #[test]
    fn test_auth_login() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        assert_eq!(cmd.serialize(), b"AUTH LOGIN\r\n");
    }

    #[test]
    fn test_auth_response_is_bare_line() {
        let cmd = Command::AuthResponse("dXNlcg==".to_string());
        assert_eq!(cmd.serialize(), b"dXNlcg==\r\n");
    }

    #[test]
    fn test_mail_from() {
        let from = Address::new("sender@example.com").unwrap();
        let cmd = Command::MailFrom {
            from: from.clone(),
            size: None,
        };
        assert_eq!(cmd.serialize(), b"MAIL FROM:<sender@example.com>\r\n");

        let cmd = Command::MailFrom {
            from,
            size: Some(12345),
        };
        assert_eq!(cmd.serialize(), b"MAIL FROM:<sender@example.com> SIZE=12345\r\n");
    }

    #[test]
    fn test_rcpt_to_command() {
        let cmd = Command::RcptTo {
            to: Address::new("recipient@kindle.com").unwrap(),
        };
        assert_eq!(cmd.serialize(), b"RCPT TO:<recipient@kindle.com>\r\n");
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Rset.serialize(), b"RSET\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
    }

    #[test]
    fn test_display_redacts_credentials() {
        let cmd = Command::AuthResponse("c2VjcmV0".to_string());
        assert_eq!(cmd.to_string(), "<redacted>");
        assert_eq!(format!("{cmd:?}"), "Command(<redacted>)");

        let cmd = Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some("AHVzZXIAcGFzcw==".to_string()),
        };
        assert_eq!(cmd.to_string(), "AUTH PLAIN <redacted>");
        assert_eq!(Command::Data.to_string(), "DATA");
    }
}
