//! Delivery pipeline.
//!
//! Session establishment and file preparation start together. Preparation
//! runs on one blocking worker, in input order, feeding a queue sized to the
//! number of files. Once the session is ready the queue is drained in order
//! and every prepared message is sent over the one session.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::task::{FileTask, prepare};
use kindlemail_mime::MessageBuilder;
use kindlemail_smtp::{Address, Connector, SessionConfig, TransferProgress, establish};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Receives pipeline events, in order, on the draining task.
pub trait Reporter {
    /// The session is ready after the given number of attempts.
    fn session_ready(&mut self, _attempts: u32) {}

    /// A prepared task was taken off the queue; replay its log here.
    fn task_drained(&mut self, task: &FileTask);

    /// A block of `source`'s message was written.
    fn progress(&mut self, source: &Path, progress: &TransferProgress);

    /// `source` is finished, successfully or not.
    fn finished(&mut self, report: &FileReport);
}

/// Outcome for one input file.
#[derive(Debug)]
pub struct FileReport {
    /// File as given.
    pub source: PathBuf,
    /// Transfer statistics, or why the file was not delivered.
    pub outcome: Result<TransferProgress>,
}

/// Per-file outcomes in input order.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// One report per input file.
    pub files: Vec<FileReport>,
}

impl RunSummary {
    /// Number of files delivered.
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_ok()).count()
    }

    /// Number of files that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.files.len() - self.delivered()
    }

    /// Returns true if every file was delivered.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Everything needed to deliver a batch of files.
#[derive(Debug)]
pub struct Pipeline<C> {
    connector: Arc<C>,
    session: SessionConfig,
    builder: MessageBuilder,
    from: Address,
    to: Address,
}

impl<C> Pipeline<C>
where
    C: Connector + 'static,
    C::Stream: 'static,
{
    /// Creates a pipeline delivering through `connector` with `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration's addresses or boundary are
    /// invalid.
    pub fn new(connector: C, config: &Config) -> Result<Self> {
        let (from, to) = config.envelope()?;
        Ok(Self {
            connector: Arc::new(connector),
            session: config.session(),
            builder: config.message_builder()?,
            from,
            to,
        })
    }

    /// Delivers `files`.
    ///
    /// Per-file failures are recorded in the summary and never stop the run.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be established within its
    /// attempt budget, in which case nothing is sent.
    pub async fn run<R: Reporter>(&self, files: Vec<PathBuf>, reporter: &mut R) -> Result<RunSummary> {
        let total = files.len();

        let (ready_tx, ready_rx) = oneshot::channel();
        let connector = Arc::clone(&self.connector);
        let session_config = self.session.clone();
        tokio::spawn(async move {
            info!(address = %session_config.address, "connecting to mail server");
            let result = establish(connector.as_ref(), &session_config).await;
            let _ = ready_tx.send(result);
        });

        let (task_tx, mut task_rx) = mpsc::channel(total.max(1));
        let builder = self.builder.clone();
        let converter = tokio::task::spawn_blocking(move || {
            for (index, source) in files.into_iter().enumerate() {
                if task_tx.blocking_send(prepare(index, source, &builder)).is_err() {
                    debug!("delivery abandoned, stopping preparation");
                    return;
                }
            }
            info!(total, "all files prepared");
        });

        let mut session = ready_rx
            .await
            .map_err(|_| Error::Worker("session task ended without a result".into()))??;
        reporter.session_ready(session.attempts());

        let mut summary = RunSummary::default();
        for expected in 0..total {
            let task = task_rx
                .recv()
                .await
                .ok_or_else(|| Error::Worker("preparation stopped early".into()))?;
            if task.index != expected {
                return Err(Error::Worker(format!(
                    "task {} drained in position {expected}",
                    task.index
                )));
            }
            reporter.task_drained(&task);

            let source = task.source;
            let outcome = match task.outcome {
                Ok(message) => session
                    .send(&self.from, &self.to, message.as_bytes(), |p| {
                        reporter.progress(&source, p);
                    })
                    .await
                    .map_err(Error::from),
                Err(e) => Err(e),
            };
            if let Err(e) = &outcome {
                warn!(source = %source.display(), error = %e, "file not delivered");
            }

            let report = FileReport { source, outcome };
            reporter.finished(&report);
            summary.files.push(report);
        }

        if let Err(e) = session.close().await {
            warn!(error = %e, "QUIT failed");
        }
        converter
            .await
            .map_err(|e| Error::Worker(format!("preparation worker failed: {e}")))?;

        info!(
            delivered = summary.delivered(),
            failed = summary.failed(),
            "run complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn report(ok: bool) -> FileReport {
        FileReport {
            source: PathBuf::from("f"),
            outcome: if ok {
                Ok(TransferProgress {
                    sent: 1,
                    total: 1,
                    elapsed: Duration::ZERO,
                })
            } else {
                Err(Error::Worker("x".into()))
            },
        }
    }

    #[test]
    fn test_summary_counts() {
        let summary = RunSummary {
            files: vec![report(true), report(false), report(true)],
        };
        assert_eq!(summary.delivered(), 2);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.is_success());
        assert!(RunSummary::default().is_success());
    }
}
