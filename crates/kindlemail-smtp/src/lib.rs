//! # kindlemail-smtp
//!
//! SMTP submission client (RFC 5321) for delivering prebuilt messages.
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of valid
//!   SMTP state transitions
//! - **Session establishment**: dial, EHLO, opportunistic STARTTLS or implicit
//!   TLS, AUTH LOGIN, retried as one unit within a fixed attempt budget
//! - **Transmission**: MAIL/RCPT/DATA with SIZE checks, dot-stuffing,
//!   short-write detection and RSET after a rejected envelope
//! - **Transport seam**: every network step goes through [`Connector`], so
//!   the state machine runs against scripted streams in tests
//!
//! ## Quick Start
//!
//! ```ignore
//! use kindlemail_smtp::{Address, SessionConfig, TcpConnector, establish};
//!
//! #[tokio::main]
//! async fn main() -> kindlemail_smtp::Result<()> {
//!     let config = SessionConfig::new(
//!         "smtp.example.com:587",
//!         "smtp.example.com",
//!         "me@example.com",
//!         "password",
//!     );
//!     let mut session = establish(&TcpConnector::new(), &config).await?;
//!
//!     let from = Address::new("me@example.com")?;
//!     let to = Address::new("me@kindle.com")?;
//!     let message = b"Subject: Test\r\n\r\nHello, World!\r\n";
//!     session.send(&from, &to, message, |_| {}).await?;
//!
//!     session.close().await
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Disconnected ─ dial ─→ Connected ─ EHLO ─→ Greeted ─ STARTTLS ─→ SecureChannel
//!                                               │                        │
//!                                               └──── AUTH LOGIN ────────┴─→ Authenticated ─→ Ready
//! ```
//!
//! Any failed transition abandons the attempt; the next attempt re-dials.
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Transports, type-state client and session
//! - [`parser`]: Response parser
//! - [`types`]: Core SMTP types (addresses, extensions, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Connector, DATA_BLOCK_SIZE, DEFAULT_MAX_ATTEMPTS,
    DataStream, Greeted, ServerInfo, Session, SessionConfig, SessionState, SmtpConnection,
    SmtpStream, TcpConnector, TlsMode, TransferProgress, establish,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
