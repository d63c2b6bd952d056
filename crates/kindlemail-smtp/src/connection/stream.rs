//! Transport layer: plain/TLS streams and the dialer seam.

use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    client::TlsStream,
    rustls::{ClientConfig, RootCertStore},
};

/// Default time allowed for the TCP connect.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens transports and upgrades them to TLS.
///
/// The session drives every network step through this trait, so tests can
/// substitute scripted in-memory streams for real sockets.
pub trait Connector: Send + Sync {
    /// Byte stream produced by this connector.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Opens a connection to `address` (`host:port`).
    fn dial(&self, address: &str) -> impl Future<Output = Result<Self::Stream>> + Send;

    /// Performs a TLS handshake over `stream`, verifying the certificate
    /// against `server_name`.
    fn upgrade(
        &self,
        stream: Self::Stream,
        server_name: &str,
    ) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// SMTP stream (TCP or TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Tcp(TcpStream),
    /// TLS-encrypted connection (boxed to reduce enum size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for SmtpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SmtpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Real network connector: TCP dial with timeout, rustls with the webpki
/// root store.
#[derive(Clone)]
pub struct TcpConnector {
    tls: TlsConnector,
    connect_timeout: Duration,
}

impl TcpConnector {
    /// Creates a connector trusting the bundled webpki roots.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tls: create_tls_connector(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TcpConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpConnector")
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl Connector for TcpConnector {
    type Stream = SmtpStream;

    async fn dial(&self, address: &str) -> Result<SmtpStream> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connecting to {address} timed out"),
                )
            })??;
        Ok(SmtpStream::Tcp(stream))
    }

    async fn upgrade(&self, stream: SmtpStream, server_name: &str) -> Result<SmtpStream> {
        let tcp_stream = match stream {
            SmtpStream::Tcp(tcp) => tcp,
            SmtpStream::Tls(_) => return Err(Error::InvalidState("Already using TLS".into())),
        };

        let name = ServerName::try_from(server_name.to_string())
            .map_err(|_| Error::Tls(format!("invalid server name: {server_name}")))?;

        let tls_stream = self
            .tls
            .connect(name, tcp_stream)
            .await
            .map_err(|e| Error::Tls(format!("handshake with {server_name} failed: {e}")))?;
        Ok(SmtpStream::Tls(Box::new(tls_stream)))
    }
}

/// Creates a TLS connector with the webpki root certificates.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
