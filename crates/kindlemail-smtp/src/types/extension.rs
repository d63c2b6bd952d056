//! SMTP extension types.

/// SMTP extensions discovered from EHLO response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH - Authentication
    Auth(Vec<AuthMechanism>),
    /// SIZE - Maximum message size
    Size(Option<usize>),
    /// 8BITMIME - 8-bit MIME transport
    EightBitMime,
    /// PIPELINING - Command pipelining
    Pipelining,
    /// SMTPUTF8 - UTF-8 email addresses
    SmtpUtf8,
    /// Unknown extension
    Unknown(String),
}

impl Extension {
    /// Parses an extension line from EHLO response.
    ///
    /// Accepts the obsolete `AUTH=LOGIN` spelling some servers still send.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split(|c: char| c.is_whitespace() || c == '=');
        let Some(keyword) = parts.next().filter(|k| !k.is_empty()) else {
            return Self::Unknown(line.to_string());
        };

        match keyword.to_ascii_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(
                parts
                    .filter(|m| !m.is_empty())
                    .map(AuthMechanism::parse)
                    .collect(),
            ),
            "SIZE" => Self::Size(parts.next().and_then(|s| s.parse().ok())),
            "8BITMIME" => Self::EightBitMime,
            "PIPELINING" => Self::Pipelining,
            "SMTPUTF8" => Self::SmtpUtf8,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN - plaintext authentication
    Plain,
    /// LOGIN - username/password challenge pair
    Login,
    /// Any other mechanism, kept by name
    Other(String),
}

impl AuthMechanism {
    /// Parses an authentication mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "PLAIN" => Self::Plain,
            "LOGIN" => Self::Login,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the mechanism name as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
            Self::Other(name) => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_starttls_any_case() {
        assert_eq!(Extension::parse("STARTTLS"), Extension::StartTls);
        assert_eq!(Extension::parse("starttls"), Extension::StartTls);
    }

    #[test]
    fn parse_auth_mechanisms() {
        assert_eq!(
            Extension::parse("AUTH PLAIN LOGIN XOAUTH2"),
            Extension::Auth(vec![
                AuthMechanism::Plain,
                AuthMechanism::Login,
                AuthMechanism::Other("XOAUTH2".to_string()),
            ])
        );
    }

    #[test]
    fn parse_obsolete_auth_form() {
        assert_eq!(
            Extension::parse("AUTH=LOGIN"),
            Extension::Auth(vec![AuthMechanism::Login])
        );
    }

    #[test]
    fn parse_size() {
        assert_eq!(Extension::parse("SIZE 52428800"), Extension::Size(Some(52_428_800)));
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
    }

    #[test]
    fn parse_flags() {
        assert_eq!(Extension::parse("8BITMIME"), Extension::EightBitMime);
        assert_eq!(Extension::parse("PIPELINING"), Extension::Pipelining);
        assert_eq!(Extension::parse("SMTPUTF8"), Extension::SmtpUtf8);
    }

    #[test]
    fn parse_unknown_and_empty() {
        assert_eq!(
            Extension::parse("X-CUSTOM foo"),
            Extension::Unknown("X-CUSTOM foo".to_string())
        );
        assert!(matches!(Extension::parse(""), Extension::Unknown(_)));
    }

    #[test]
    fn mechanism_names() {
        assert_eq!(AuthMechanism::Login.as_str(), "LOGIN");
        assert_eq!(AuthMechanism::parse("cram-md5").as_str(), "CRAM-MD5");
    }
}
