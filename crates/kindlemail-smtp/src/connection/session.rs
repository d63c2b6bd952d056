//! Session establishment with a fixed attempt budget, and per-message
//! transmission over the established session.

use super::client::{Authenticated, Client, Connected, Greeted, SmtpConnection};
use super::{Connector, ServerInfo};
use crate::error::{Error, Result};
use crate::types::Address;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Establishment attempts made before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Size of the blocks message content is written in.
pub const DATA_BLOCK_SIZE: usize = 64 * 1024;

/// How the connection is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Upgrade with STARTTLS when the server offers it.
    #[default]
    Opportunistic,
    /// TLS from the first byte (submission over port 465).
    Implicit,
}

/// Parameters for establishing a session.
#[derive(Clone)]
pub struct SessionConfig {
    /// `host:port` to dial.
    pub address: String,
    /// Name the server certificate is verified against.
    pub server_name: String,
    /// Identity sent with EHLO.
    pub identity: String,
    /// Login username.
    pub username: String,
    /// Login password.
    pub password: String,
    /// TLS mode.
    pub tls: TlsMode,
    /// Attempt budget; each attempt re-dials from scratch.
    pub max_attempts: u32,
}

impl SessionConfig {
    /// Creates a configuration with the default identity, TLS mode and
    /// attempt budget.
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        server_name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            server_name: server_name.into(),
            identity: "localhost".to_string(),
            username: username.into(),
            password: password.into(),
            tls: TlsMode::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets the EHLO identity.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Sets the TLS mode.
    #[must_use]
    pub const fn with_tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    /// Sets the attempt budget.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("address", &self.address)
            .field("server_name", &self.server_name)
            .field("identity", &self.identity)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tls", &self.tls)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

/// Observable states of session establishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection.
    Disconnected,
    /// Transport open, greeting received.
    Connected,
    /// EHLO accepted.
    Greeted,
    /// Connection upgraded with STARTTLS.
    SecureChannel,
    /// Credentials accepted.
    Authenticated,
    /// Ready to carry messages.
    Ready,
    /// Attempt budget exhausted.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Greeted => "greeted",
            Self::SecureChannel => "secure",
            Self::Authenticated => "authenticated",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One establishment attempt, one stage at a time.
enum Stage<S> {
    Disconnected,
    Connected(Client<S, Connected>),
    Greeted(Client<S, Greeted>),
    SecureChannel(Client<S, Greeted>),
    Authenticated(Client<S, Authenticated>),
    Ready(Client<S, Authenticated>),
}

impl<S> Stage<S> {
    const fn state(&self) -> SessionState {
        match self {
            Self::Disconnected => SessionState::Disconnected,
            Self::Connected(_) => SessionState::Connected,
            Self::Greeted(_) => SessionState::Greeted,
            Self::SecureChannel(_) => SessionState::SecureChannel,
            Self::Authenticated(_) => SessionState::Authenticated,
            Self::Ready(_) => SessionState::Ready,
        }
    }
}

impl<S> Stage<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
    /// Performs the wire exchange that leads out of the current stage.
    async fn advance<C>(self, connector: &C, config: &SessionConfig) -> Result<Self>
    where
        C: Connector<Stream = S>,
    {
        match self {
            Self::Disconnected => {
                let mut stream = connector.dial(&config.address).await?;
                if config.tls == TlsMode::Implicit {
                    stream = connector.upgrade(stream, &config.server_name).await?;
                }
                Ok(Self::Connected(Client::from_stream(stream).await?))
            }
            Self::Connected(client) => Ok(Self::Greeted(client.ehlo(&config.identity).await?)),
            Self::Greeted(client)
                if config.tls == TlsMode::Opportunistic
                    && client.server_info().supports_starttls() =>
            {
                let client = client.starttls(connector, &config.server_name).await?;
                Ok(Self::SecureChannel(client))
            }
            Self::Greeted(client) | Self::SecureChannel(client) => Ok(Self::Authenticated(
                client
                    .auth_login(&config.username, &config.password)
                    .await?,
            )),
            Self::Authenticated(client) => Ok(Self::Ready(client)),
            Self::Ready(_) => Err(Error::InvalidState("session already ready".into())),
        }
    }
}

async fn attempt<C: Connector>(
    connector: &C,
    config: &SessionConfig,
) -> Result<Client<C::Stream, Authenticated>> {
    let mut stage = Stage::Disconnected;
    loop {
        let from = stage.state();
        stage = stage.advance(connector, config).await?;
        debug!(%from, to = %stage.state(), "SMTP session transition");
        if let Stage::Ready(client) = stage {
            return Ok(client);
        }
    }
}

/// Establishes a session, re-dialling from scratch up to
/// `config.max_attempts` times.
///
/// # Errors
///
/// Returns [`Error::Establish`] carrying the last attempt's error when no
/// attempt reaches the ready state.
pub async fn establish<C: Connector>(
    connector: &C,
    config: &SessionConfig,
) -> Result<Session<C::Stream>> {
    let budget = config.max_attempts.max(1);
    let mut last = Error::InvalidState("no establishment attempt made".into());

    for n in 1..=budget {
        match attempt(connector, config).await {
            Ok(client) => {
                info!(
                    server = %client.server_info().hostname,
                    attempts = n,
                    "SMTP session ready"
                );
                return Ok(Session {
                    client,
                    attempts: n,
                });
            }
            Err(e) => {
                warn!(attempt = n, budget, error = %e, "SMTP session attempt failed");
                last = e;
            }
        }
    }

    warn!(state = %SessionState::Failed, "SMTP attempt budget exhausted");
    Err(Error::Establish {
        attempts: budget,
        source: Box::new(last),
    })
}

/// Progress of one message transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Content bytes written so far.
    pub sent: usize,
    /// Total content bytes.
    pub total: usize,
    /// Time since the content transfer began.
    pub elapsed: Duration,
}

impl TransferProgress {
    /// Average throughput in bytes per second.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bytes_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.sent as f64 / secs
        } else {
            0.0
        }
    }
}

/// An authenticated session ready to carry messages.
///
/// Owns the single connection. Messages are sent one at a time; a failed
/// message leaves the session usable for the next one.
#[derive(Debug)]
pub struct Session<S> {
    client: Client<S, Authenticated>,
    attempts: u32,
}

impl<S> Session<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
    /// Attempts it took to establish the session.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Capabilities the server advertised.
    #[must_use]
    pub fn server_info(&self) -> &ServerInfo {
        self.client.server_info()
    }

    /// Sends one message, calling `progress` after every block written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if the message exceeds the
    /// server's SIZE limit, [`Error::ShortWrite`] if the transport stopped
    /// accepting content, or the server's rejection.
    pub async fn send<F>(
        &mut self,
        from: &Address,
        to: &Address,
        message: &[u8],
        mut progress: F,
    ) -> Result<TransferProgress>
    where
        F: FnMut(&TransferProgress),
    {
        let total = message.len();
        let advertised = self.client.server_info().max_message_size();
        if let Some(limit) = advertised.filter(|&limit| limit > 0)
            && total > limit
        {
            return Err(Error::MessageTooLarge { size: total, limit });
        }

        if let Err(e) = self.envelope(from, to, advertised.map(|_| total)).await {
            self.reset_after(&e).await;
            return Err(e);
        }

        let started = Instant::now();
        let mut report = TransferProgress {
            sent: 0,
            total,
            elapsed: Duration::ZERO,
        };

        let mut data = match self.client.data().await {
            Ok(data) => data,
            Err(e) => {
                self.reset_after(&e).await;
                return Err(e);
            }
        };
        let mut failure = None;
        for block in message.chunks(DATA_BLOCK_SIZE) {
            match data.write(block).await {
                Ok(n) => {
                    report.sent += n;
                    report.elapsed = started.elapsed();
                    progress(&report);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let committed = data.close().await;
        if let Some(e) = failure {
            if let Err(close) = committed {
                debug!(error = %close, "closing DATA after failed write");
            }
            return Err(e);
        }
        committed?;

        report.elapsed = started.elapsed();
        Ok(report)
    }

    async fn envelope(&mut self, from: &Address, to: &Address, size: Option<usize>) -> Result<()> {
        self.client.mail_from(from, size).await?;
        self.client.rcpt_to(to).await
    }

    async fn reset_after(&mut self, cause: &Error) {
        if matches!(cause, Error::SmtpError { .. })
            && let Err(e) = self.client.reset().await
        {
            warn!(error = %e, "RSET after rejected transaction failed");
        }
    }

    /// Ends the session with QUIT.
    ///
    /// # Errors
    ///
    /// Returns an error if QUIT fails.
    pub async fn close(self) -> Result<()> {
        self.client.quit().await
    }
}
