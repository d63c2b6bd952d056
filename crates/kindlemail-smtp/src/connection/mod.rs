//! SMTP connection management with type-state pattern.

mod client;
mod data;
mod session;
mod stream;

pub use client::{Authenticated, Client, Connected, Greeted, REPLY_TIMEOUT, SmtpConnection};
pub use data::DataStream;
pub use session::{
    DATA_BLOCK_SIZE, DEFAULT_MAX_ATTEMPTS, Session, SessionConfig, SessionState, TlsMode,
    TransferProgress, establish,
};
pub use stream::{Connector, DEFAULT_CONNECT_TIMEOUT, SmtpStream, TcpConnector};

use crate::types::Extension;
use std::collections::HashSet;

/// Server capabilities from EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Returns the maximum message size, if advertised.
    ///
    /// `Some(0)` means the server declared no fixed limit.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(size) => Some(size.unwrap_or(0)),
            _ => None,
        })
    }

    /// Returns supported authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<crate::types::AuthMechanism> {
        for ext in &self.extensions {
            if let Extension::Auth(mechanisms) = ext {
                return mechanisms.clone();
            }
        }
        Vec::new()
    }
}
