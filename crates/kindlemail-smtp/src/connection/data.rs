//! Message content transfer after `354`.

use super::client::read_reply;
use crate::error::{Error, Result};
use crate::types::Reply;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Writer for the `DATA` phase of a mail transaction.
///
/// Content is written in blocks. Line endings are normalized to CRLF and
/// lines starting with `.` are dot-stuffed (RFC 5321 section 4.5.2); both
/// rules hold across block boundaries. [`DataStream::close`] must be called
/// to terminate the content, even after a failed write, so the connection
/// returns to command mode.
#[derive(Debug)]
pub struct DataStream<'a, S> {
    reader: &'a mut BufReader<S>,
    at_line_start: bool,
    prev_cr: bool,
    buf: Vec<u8>,
}

impl<'a, S: AsyncRead + AsyncWrite + Unpin> DataStream<'a, S> {
    pub(crate) const fn new(reader: &'a mut BufReader<S>) -> Self {
        Self {
            reader,
            at_line_start: true,
            prev_cr: false,
            buf: Vec::new(),
        }
    }

    /// Writes one block of message content and returns the number of
    /// content bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShortWrite`] if the transport stops accepting bytes
    /// before the whole block is written, or an I/O error.
    pub async fn write(&mut self, block: &[u8]) -> Result<usize> {
        self.buf.clear();
        self.buf.reserve(block.len() + block.len() / 64 + 2);
        for &byte in block {
            if byte == b'\n' && !self.prev_cr {
                self.buf.push(b'\r');
            }
            if byte == b'.' && self.at_line_start {
                self.buf.push(b'.');
            }
            self.buf.push(byte);
            self.prev_cr = byte == b'\r';
            self.at_line_start = byte == b'\n';
        }

        let stream = self.reader.get_mut();
        let offered = self.buf.len();
        let mut accepted = 0;
        while accepted < offered {
            match stream.write(&self.buf[accepted..]).await {
                Ok(0) => {
                    self.mid_line();
                    return Err(Error::ShortWrite { accepted, offered });
                }
                Ok(n) => accepted += n,
                Err(e) => {
                    self.mid_line();
                    return Err(e.into());
                }
            }
        }
        Ok(block.len())
    }

    /// The wire may end inside a line; `close` must start a fresh one.
    fn mid_line(&mut self) {
        self.at_line_start = false;
        self.prev_cr = false;
    }

    /// Terminates the content with `<CRLF>.<CRLF>` and returns the server's
    /// verdict on the message.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or the server rejects the message.
    pub async fn close(self) -> Result<Reply> {
        let stream = self.reader.get_mut();
        if !self.at_line_start {
            stream.write_all(b"\r\n").await?;
        }
        stream.write_all(b".\r\n").await?;
        stream.flush().await?;

        read_reply(self.reader).await?.ensure_success()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_plain_content() {
        let mock = Builder::new()
            .write(b"Subject: hi\r\n\r\nbody\r\n")
            .write(b".\r\n")
            .read(b"250 2.0.0 queued\r\n")
            .build();
        let mut reader = BufReader::new(mock);

        let mut data = DataStream::new(&mut reader);
        assert_eq!(data.write(b"Subject: hi\r\n\r\nbody\r\n").await.unwrap(), 21);
        let reply = data.close().await.unwrap();
        assert_eq!(reply.message_text(), "2.0.0 queued");
    }

    #[tokio::test]
    async fn test_dot_stuffing_across_blocks() {
        let mock = Builder::new()
            .write(b"..leading\r\nline\r\n")
            .write(b"..split")
            .write(b"\r\n")
            .write(b".\r\n")
            .read(b"250 OK\r\n")
            .build();
        let mut reader = BufReader::new(mock);

        let mut data = DataStream::new(&mut reader);
        data.write(b".leading\r\nline\r\n").await.unwrap();
        data.write(b".split").await.unwrap();
        assert!(data.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_bare_lf_normalized() {
        let mock = Builder::new()
            .write(b"a\r\nb\r")
            .write(b"\nc\r\n")
            .write(b".\r\n")
            .read(b"250 OK\r\n")
            .build();
        let mut reader = BufReader::new(mock);

        let mut data = DataStream::new(&mut reader);
        data.write(b"a\nb\r").await.unwrap();
        data.write(b"\nc\n").await.unwrap();
        assert!(data.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_content() {
        let mock = Builder::new()
            .write(b"x\r\n")
            .write(b".\r\n")
            .read(b"552 5.3.4 Message too big\r\n")
            .build();
        let mut reader = BufReader::new(mock);

        let mut data = DataStream::new(&mut reader);
        data.write(b"x\r\n").await.unwrap();
        let err = data.close().await.unwrap_err();
        assert!(matches!(err, Error::SmtpError { code: 552, .. }));
    }

    /// Accepts `budget` bytes, refuses one write, then accepts everything.
    struct Stalling {
        budget: usize,
        refused: bool,
        wire: Vec<u8>,
        replies: &'static [u8],
    }

    impl AsyncRead for Stalling {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let n = self.replies.len().min(buf.remaining());
            buf.put_slice(&self.replies[..n]);
            self.replies = &self.replies[n..];
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for Stalling {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let n = if self.budget > 0 {
                let n = self.budget.min(buf.len());
                self.budget -= n;
                n
            } else if self.refused {
                buf.len()
            } else {
                self.refused = true;
                0
            };
            self.wire.extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_partial_write_still_terminates() {
        let mut reader = BufReader::new(Stalling {
            budget: 5,
            refused: false,
            wire: Vec::new(),
            replies: b"250 OK\r\n",
        });

        let mut data = DataStream::new(&mut reader);
        let err = data.write(b"hello world\r\n").await.unwrap_err();
        assert!(matches!(
            err,
            Error::ShortWrite {
                accepted: 5,
                offered: 13
            }
        ));
        assert!(data.close().await.is_ok());
        assert_eq!(reader.get_ref().wire, b"hello\r\n.\r\n");
    }
}
