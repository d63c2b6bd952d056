//! Envelope address type.

use crate::error::{Error, Result};

/// Email address for the SMTP envelope (`MAIL FROM` / `RCPT TO`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into().trim().to_string();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Basic syntactic check: one `@`, non-empty local and domain parts, no
    /// characters that would break the envelope command line.
    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        if addr
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '<' || c == '>')
        {
            return Err(Error::InvalidAddress(format!(
                "Address contains forbidden characters: {addr}"
            )));
        }

        match addr.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                if domain.contains('@') {
                    Err(Error::InvalidAddress(
                        "Address must have exactly one @".into(),
                    ))
                } else {
                    Ok(())
                }
            }
            Some(_) => Err(Error::InvalidAddress(
                "Local and domain parts cannot be empty".into(),
            )),
            None => Err(Error::InvalidAddress("Address must contain @".into())),
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_address() {
        let addr = Address::new(" user@kindle.com ").unwrap();
        assert_eq!(addr.as_str(), "user@kindle.com");
        assert_eq!(addr.to_string(), "user@kindle.com");
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(Address::new("").is_err());
        assert!(Address::new("userexample.com").is_err());
        assert!(Address::new("@example.com").is_err());
        assert!(Address::new("user@").is_err());
        assert!(Address::new("a@b@c").is_err());
        assert!(Address::new("a b@c").is_err());
        assert!(Address::new("a@b>\r\nRCPT TO:<x@y").is_err());
    }
}
