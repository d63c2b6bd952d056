//! Integration tests for the delivery pipeline.
//!
//! These tests use a mock stream to simulate SMTP server replies without
//! requiring a real server connection.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use kindlemail_core::{Config, Error, FileReport, FileTask, Pipeline, Reporter};
use kindlemail_smtp::{Connector, TransferProgress};

/// Mock stream that returns predefined replies.
struct MockStream {
    /// Replies to return (in order).
    replies: Cursor<Vec<u8>>,
    /// Captured bytes sent by the client.
    sent: Arc<Mutex<Vec<u8>>>,
    /// The first write containing this is refused once (returns 0).
    refuse_write: Option<Vec<u8>>,
}

impl MockStream {
    fn new(replies: &[u8]) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            replies: Cursor::new(replies.to_vec()),
            sent: Arc::clone(&sent),
            refuse_write: None,
        };
        (stream, sent)
    }

    fn refusing_write_containing(mut self, needle: &[u8]) -> Self {
        self.refuse_write = Some(needle.to_vec());
        self
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.replies.get_ref();
        let pos = usize::try_from(self.replies.position()).unwrap();

        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.replies.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let refuse = self
            .refuse_write
            .as_ref()
            .is_some_and(|needle| buf.windows(needle.len()).any(|w| w == needle.as_slice()));
        if refuse {
            self.refuse_write = None;
            return Poll::Ready(Ok(0));
        }
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Hands out one mock stream per dial.
struct MockConnector {
    streams: Mutex<VecDeque<MockStream>>,
}

impl MockConnector {
    fn new(streams: Vec<MockStream>) -> Self {
        Self {
            streams: Mutex::new(streams.into()),
        }
    }
}

impl Connector for MockConnector {
    type Stream = MockStream;

    async fn dial(&self, _address: &str) -> kindlemail_smtp::Result<MockStream> {
        let next = self.streams.lock().unwrap().pop_front();
        next.ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "refused").into())
    }

    async fn upgrade(
        &self,
        stream: MockStream,
        _server_name: &str,
    ) -> kindlemail_smtp::Result<MockStream> {
        Ok(stream)
    }
}

#[derive(Default)]
struct Recorder {
    ready: Vec<u32>,
    drained: Vec<usize>,
    progress: usize,
    finished: Vec<(PathBuf, bool)>,
}

impl Reporter for Recorder {
    fn session_ready(&mut self, attempts: u32) {
        self.ready.push(attempts);
    }

    fn task_drained(&mut self, task: &FileTask) {
        assert!(!task.log.is_empty());
        self.drained.push(task.index);
    }

    fn progress(&mut self, _source: &Path, _progress: &TransferProgress) {
        self.progress += 1;
    }

    fn finished(&mut self, report: &FileReport) {
        self.finished
            .push((report.source.clone(), report.outcome.is_ok()));
    }
}

const CONFIG: &str = r#"
[server]
host = "smtp.example.com"
address = "smtp.example.com:587"
identity = "reader"

[account]
user = "me@example.com"
password = "secret"

[delivery]
to = "me@kindle.com"
boundary = "pipeline-test-boundary"
"#;

const LOGIN: &[u8] = b"220 smtp.example.com ESMTP\r\n\
250-smtp.example.com\r\n250 AUTH LOGIN\r\n\
334 VXNlcm5hbWU6\r\n\
334 UGFzc3dvcmQ6\r\n";

const ACCEPT_MESSAGE: &[u8] = b"250 sender ok\r\n\
250 recipient ok\r\n\
354 go ahead\r\n\
250 queued\r\n";

fn script(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| w == &needle).count()
}

fn position(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[tokio::test]
async fn test_mixed_inputs_delivered_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let text = dir.path().join("book.txt");
    std::fs::write(&text, "Chapter 1\n\n  It begins.\n").unwrap();
    let missing = dir.path().join("missing.pdf");
    let pdf = dir.path().join("paper.pdf");
    std::fs::write(&pdf, b"%PDF-1.7 fake").unwrap();

    let replies = script(&[
        LOGIN,
        b"235 ok\r\n",
        ACCEPT_MESSAGE,
        ACCEPT_MESSAGE,
        b"221 bye\r\n",
    ]);
    let (stream, sent) = MockStream::new(&replies);
    let config = Config::parse(CONFIG).unwrap();
    let pipeline = Pipeline::new(MockConnector::new(vec![stream]), &config).unwrap();

    let mut recorder = Recorder::default();
    let summary = pipeline
        .run(vec![text.clone(), missing.clone(), pdf.clone()], &mut recorder)
        .await
        .unwrap();

    assert_eq!(summary.files.len(), 3);
    assert_eq!(summary.delivered(), 2);
    assert!(summary.files[0].outcome.is_ok());
    assert!(matches!(summary.files[1].outcome, Err(Error::Build { .. })));
    assert!(summary.files[2].outcome.is_ok());

    assert_eq!(recorder.ready, vec![1]);
    assert_eq!(recorder.drained, vec![0, 1, 2]);
    assert_eq!(
        recorder.finished,
        vec![(text, true), (missing, false), (pdf, true)]
    );
    assert!(recorder.progress >= 2);

    let sent = sent.lock().unwrap();
    assert_eq!(count(&sent, b"MAIL FROM:<me@example.com>"), 2);
    let html = position(&sent, b"filename*=UTF-8''book.html").unwrap();
    let paper = position(&sent, b"filename*=UTF-8''paper.pdf").unwrap();
    assert!(html < paper);
    assert!(sent.ends_with(b"QUIT\r\n"));
}

#[tokio::test]
async fn test_rejected_login_sends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("paper.pdf");
    std::fs::write(&pdf, b"%PDF").unwrap();

    let rejected = script(&[LOGIN, b"535 5.7.8 Authentication failed\r\n"]);
    let mut streams = Vec::new();
    let mut captured = Vec::new();
    for _ in 0..3 {
        let (stream, sent) = MockStream::new(&rejected);
        streams.push(stream);
        captured.push(sent);
    }
    let config = Config::parse(CONFIG).unwrap();
    let pipeline = Pipeline::new(MockConnector::new(streams), &config).unwrap();

    let mut recorder = Recorder::default();
    let err = pipeline.run(vec![pdf], &mut recorder).await.unwrap_err();

    match err {
        Error::Smtp(smtp) => {
            assert!(matches!(
                smtp,
                kindlemail_smtp::Error::Establish { attempts: 3, .. }
            ));
            assert!(matches!(
                smtp.root(),
                kindlemail_smtp::Error::SmtpError { code: 535, .. }
            ));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(recorder.ready.is_empty());
    assert!(recorder.finished.is_empty());
    for sent in captured {
        let sent = sent.lock().unwrap();
        assert_eq!(count(&sent, b"AUTH LOGIN"), 1);
        assert_eq!(count(&sent, b"MAIL FROM"), 0);
    }
}

#[tokio::test]
async fn test_short_write_does_not_end_session() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.pdf");
    let second = dir.path().join("second.pdf");
    std::fs::write(&first, b"first").unwrap();
    std::fs::write(&second, b"second").unwrap();

    let replies = script(&[
        LOGIN,
        b"235 ok\r\n",
        // first message: content cut short, terminator still accepted
        ACCEPT_MESSAGE,
        ACCEPT_MESSAGE,
        b"221 bye\r\n",
    ]);
    let (stream, sent) = MockStream::new(&replies);
    let stream = stream.refusing_write_containing(b"filename*=UTF-8''first.pdf");
    let config = Config::parse(CONFIG).unwrap();
    let pipeline = Pipeline::new(MockConnector::new(vec![stream]), &config).unwrap();

    let mut recorder = Recorder::default();
    let summary = pipeline
        .run(vec![first, second], &mut recorder)
        .await
        .unwrap();

    assert!(matches!(
        summary.files[0].outcome,
        Err(Error::Smtp(kindlemail_smtp::Error::ShortWrite { accepted: 0, .. }))
    ));
    assert!(summary.files[1].outcome.is_ok());

    let sent = sent.lock().unwrap();
    assert_eq!(count(&sent, b"MAIL FROM"), 2);
    assert_eq!(count(&sent, b"filename*=UTF-8''first.pdf"), 0);
    assert_eq!(count(&sent, b"filename*=UTF-8''second.pdf"), 1);
    assert!(sent.ends_with(b"QUIT\r\n"));
}
