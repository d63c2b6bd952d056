//! Type-state SMTP client.

use super::data::DataStream;
use super::{Connector, ServerInfo};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashSet;
use std::io;
use std::marker::PhantomData;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

/// Type-state marker: server greeting received.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker: EHLO accepted, capabilities known.
#[derive(Debug)]
pub struct Greeted;

/// Type-state marker: credentials accepted, mail transactions allowed.
#[derive(Debug)]
pub struct Authenticated;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<S, State> {
    reader: BufReader<S>,
    server_info: ServerInfo,
    identity: String,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;
}

impl<S, State> SmtpConnection for Client<S, State> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Client<S, Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut reader = BufReader::new(stream);
        let greeting = read_reply(&mut reader).await?.ensure_success()?;

        // Extract hostname from greeting (first word after code)
        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(server = %hostname, "SMTP greeting received");

        Ok(Self {
            reader,
            server_info: ServerInfo {
                hostname,
                extensions: HashSet::new(),
            },
            identity: String::new(),
            _state: PhantomData,
        })
    }

    /// Sends EHLO with the client's identity and discovers server capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, identity: &str) -> Result<Client<S, Greeted>> {
        self.identity = identity.to_string();
        self.hello().await?;
        Ok(self.transition())
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Client<S, Greeted> {
    /// Upgrades the connection to TLS using STARTTLS, then repeats EHLO as
    /// RFC 3207 requires.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not supported or if the upgrade fails.
    pub async fn starttls<C>(mut self, connector: &C, server_name: &str) -> Result<Self>
    where
        C: Connector<Stream = S>,
    {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.send_command(Command::StartTls)
            .await?
            .ensure_code(ReplyCode::SERVICE_READY)?;

        if !self.reader.buffer().is_empty() {
            return Err(Error::Protocol(
                "Server sent data after accepting STARTTLS".into(),
            ));
        }

        let stream = connector
            .upgrade(self.reader.into_inner(), server_name)
            .await?;
        self.reader = BufReader::new(stream);
        debug!(server_name, "TLS established");

        self.hello().await?;
        Ok(self)
    }

    /// Authenticates with the LOGIN mechanism: the server asks for the
    /// username and then the password, each as a Base64 challenge.
    ///
    /// # Errors
    ///
    /// Returns an error if either challenge is missing or the credentials
    /// are rejected.
    pub async fn auth_login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let advertised = self.server_info.auth_mechanisms();
        if !advertised.is_empty() && !advertised.contains(&AuthMechanism::Login) {
            warn!(
                advertised = ?advertised,
                "server does not advertise AUTH LOGIN; trying anyway"
            );
        }

        self.send_command(Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        })
        .await?
        .ensure_code(ReplyCode::AUTH_CONTINUE)?;

        self.send_command(Command::AuthResponse(STANDARD.encode(username)))
            .await?
            .ensure_code(ReplyCode::AUTH_CONTINUE)?;

        self.send_command(Command::AuthResponse(STANDARD.encode(password)))
            .await?
            .ensure_success()?;

        debug!(username, "authenticated");
        Ok(self.transition())
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Client<S, Authenticated> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(&mut self, from: &Address, size: Option<usize>) -> Result<()> {
        let cmd = Command::MailFrom {
            from: from.clone(),
            size,
        };
        self.send_command(cmd).await?.ensure_success()?;
        Ok(())
    }

    /// Adds a recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(&mut self, to: &Address) -> Result<()> {
        let cmd = Command::RcptTo { to: to.clone() };
        self.send_command(cmd).await?.ensure_success()?;
        Ok(())
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command fails.
    pub async fn data(&mut self) -> Result<DataStream<'_, S>> {
        self.send_command(Command::Data)
            .await?
            .ensure_code(ReplyCode::START_DATA)?;
        Ok(DataStream::new(&mut self.reader))
    }

    /// Resets the current transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RSET command fails.
    pub async fn reset(&mut self) -> Result<()> {
        self.send_command(Command::Rset).await?.ensure_success()?;
        Ok(())
    }
}

// Common implementation for all states
impl<S: AsyncRead + AsyncWrite + Unpin, State> Client<S, State> {
    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        debug!(command = %cmd, "C:");
        let data = cmd.serialize();
        let stream = self.reader.get_mut();
        stream.write_all(&data).await?;
        stream.flush().await?;
        let reply = read_reply(&mut self.reader).await?;
        debug!(code = %reply.code, "S: {}", reply.message_text());
        Ok(reply)
    }

    async fn hello(&mut self) -> Result<()> {
        let cmd = Command::Ehlo {
            hostname: self.identity.clone(),
        };
        let reply = self.send_command(cmd).await?.ensure_success()?;

        // Parse extensions from EHLO response (skip first line which is greeting)
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        Ok(())
    }

    fn transition<Next>(self) -> Client<S, Next> {
        Client {
            reader: self.reader,
            server_info: self.server_info,
            identity: self.identity,
            _state: PhantomData,
        }
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;

        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(reply.into_error());
        }

        let _ = self.reader.get_mut().shutdown().await;
        Ok(())
    }
}

/// How long to wait for a complete reply before giving up on the server.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(300);

/// Reads one complete (possibly multi-line) reply within [`REPLY_TIMEOUT`].
pub(crate) async fn read_reply<S: AsyncRead + Unpin>(reader: &mut BufReader<S>) -> Result<Reply> {
    tokio::time::timeout(REPLY_TIMEOUT, read_reply_lines(reader))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "no reply from server"))?
}

async fn read_reply_lines<S: AsyncRead + Unpin>(reader: &mut BufReader<S>) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )
            .into());
        }

        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(line);
        lines.push(line.to_string());

        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}
