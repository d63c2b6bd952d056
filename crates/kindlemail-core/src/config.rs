//! Application configuration.
//!
//! Configuration is loaded from a TOML file at the first of:
//! 1. the path given with `--config` (or `$KINDLEMAIL_CONFIG`)
//! 2. `kindlemail.toml` next to the executable
//! 3. `~/.config/kindlemail/config.toml` (Linux)
//!    `~/Library/Application Support/kindlemail/config.toml` (macOS)
//!    `%APPDATA%\kindlemail\config.toml` (Windows)
//!
//! There are no built-in defaults for the server, account or recipient, so
//! a missing file is an error.

use crate::error::{Error, Result};
use kindlemail_mime::{Boundary, DEFAULT_NOTICE, DEFAULT_SUBJECT, MessageBuilder};
use kindlemail_smtp::{Address, DEFAULT_MAX_ATTEMPTS, SessionConfig, TlsMode};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "KINDLEMAIL_CONFIG";

/// File name looked up next to the executable.
pub const PORTABLE_FILE_NAME: &str = "kindlemail.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Outgoing mail server.
    pub server: ServerConfig,
    /// Sending account.
    pub account: AccountConfig,
    /// Recipient and message settings.
    pub delivery: DeliveryConfig,
}

/// Outgoing mail server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host name the TLS certificate is checked against.
    pub host: String,
    /// `host:port` to connect to.
    pub address: String,
    /// Name announced with EHLO.
    #[serde(default = "default_identity")]
    pub identity: String,
    /// How the connection is secured.
    #[serde(default)]
    pub security: Security,
    /// Connection attempts before giving up.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
}

/// Connection security.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// STARTTLS when the server offers it.
    #[default]
    StartTls,
    /// TLS from connect (usually port 465).
    Tls,
}

/// Sending account.
#[derive(Clone, Deserialize)]
pub struct AccountConfig {
    /// Sender mailbox, also used as the login name.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Display name for `From`.
    #[serde(default)]
    pub name: Option<String>,
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

/// Recipient and message settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Recipient mailbox (the device's send-to address).
    pub to: String,
    /// Display name for `To`.
    #[serde(default)]
    pub name: Option<String>,
    /// Multipart boundary token.
    pub boundary: String,
    /// Subject line.
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Plain-text body placed before the attachment.
    #[serde(default = "default_notice")]
    pub notice: String,
}

fn default_identity() -> String {
    "localhost".to_string()
}

const fn default_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn default_notice() -> String {
    DEFAULT_NOTICE.to_string()
}

impl Config {
    /// Parses and validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] for malformed TOML or missing keys and
    /// [`Error::Config`] for values that fail validation.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("server.host", &self.server.host),
            ("server.address", &self.server.address),
            ("server.identity", &self.server.identity),
            ("account.user", &self.account.user),
            ("account.password", &self.account.password),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{key} must not be empty")));
            }
        }
        if self.server.attempts == 0 {
            return Err(Error::Config("server.attempts must be at least 1".into()));
        }
        self.envelope()?;
        self.boundary()?;
        Ok(())
    }

    /// Envelope sender and recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if either mailbox is not a valid address.
    pub fn envelope(&self) -> Result<(Address, Address)> {
        let from = Address::new(&self.account.user)
            .map_err(|e| Error::Config(format!("account.user: {e}")))?;
        let to = Address::new(&self.delivery.to)
            .map_err(|e| Error::Config(format!("delivery.to: {e}")))?;
        Ok((from, to))
    }

    fn boundary(&self) -> Result<Boundary> {
        Boundary::new(&self.delivery.boundary)
            .map_err(|e| Error::Config(format!("delivery.boundary: {e}")))
    }

    /// Session parameters for the SMTP client.
    #[must_use]
    pub fn session(&self) -> SessionConfig {
        let tls = match self.server.security {
            Security::StartTls => TlsMode::Opportunistic,
            Security::Tls => TlsMode::Implicit,
        };
        SessionConfig::new(
            &self.server.address,
            &self.server.host,
            &self.account.user,
            &self.account.password,
        )
        .with_identity(&self.server.identity)
        .with_tls(tls)
        .with_max_attempts(self.server.attempts)
    }

    /// Message builder carrying the configured headers and boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if the boundary is invalid.
    pub fn message_builder(&self) -> Result<MessageBuilder> {
        Ok(MessageBuilder::new(self.boundary()?)
            .from(self.account.name.as_deref(), self.account.user.trim())
            .to(self.delivery.name.as_deref(), self.delivery.to.trim())
            .subject(&self.delivery.subject)
            .notice(&self.delivery.notice))
    }
}

/// Default per-user configuration file path.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kindlemail").join("config.toml"))
}

/// Configuration file next to the running executable.
#[must_use]
pub fn portable_config_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(PORTABLE_FILE_NAME)))
}

/// Finds the configuration file.
///
/// An explicit path is used as given, even if it does not exist.
///
/// # Errors
///
/// Returns [`Error::Config`] if no explicit path is given and none of the
/// standard locations holds a file.
pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let candidates: Vec<PathBuf> = [portable_config_path(), user_config_path()]
        .into_iter()
        .flatten()
        .collect();
    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or_else(|| {
            let searched: Vec<String> = candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            Error::Config(format!(
                "no configuration file found (searched: {})",
                searched.join(", ")
            ))
        })
}

/// Loads configuration from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is invalid.
pub fn load_from(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let config = Config::parse(&contents)?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Locates and loads the configuration.
///
/// # Errors
///
/// Returns an error if no file is found, or it cannot be read or is invalid.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    load_from(&locate(explicit)?)
}
