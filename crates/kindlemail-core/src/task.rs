//! Per-file work items.

use crate::error::{Error, Result};
use crate::html::convert;
use kindlemail_mime::{MailMessage, MessageBuilder};
use std::path::PathBuf;
use tracing::debug;

/// Diagnostics collected while preparing one file.
///
/// Owned by its task and replayed by whoever drains the task, so concurrent
/// preparation never interleaves output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskLog {
    lines: Vec<String>,
}

impl TaskLog {
    /// Appends a line.
    pub fn note(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Iterates over the collected lines.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Number of lines.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if nothing was logged.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// One input file and the message built from it.
#[derive(Debug)]
pub struct FileTask {
    /// Position in the input list.
    pub index: usize,
    /// File as given on the command line.
    pub source: PathBuf,
    /// HTML file generated from `source`, if it was converted. The file
    /// itself is removed once the message is built.
    pub converted: Option<PathBuf>,
    /// Diagnostics from preparation.
    pub log: TaskLog,
    /// The built message, or why it could not be built.
    pub outcome: Result<MailMessage>,
}

/// Converts `source` if needed and builds its message.
///
/// Never fails as a whole: errors are recorded in the returned task.
#[must_use]
pub fn prepare(index: usize, source: PathBuf, builder: &MessageBuilder) -> FileTask {
    let mut log = TaskLog::default();
    let mut converted = None;

    let outcome = convert(&source, &mut log).and_then(|conversion| {
        if conversion.is_converted() {
            converted = Some(conversion.path().to_path_buf());
        }
        let attachment = conversion.path();
        log.note(format!("building message for {}", attachment.display()));
        builder.build(attachment).map_err(|err| Error::Build {
            path: attachment.to_path_buf(),
            source: err,
        })
        // conversion dropped here, removing any generated file
    });

    match &outcome {
        Ok(message) => log.note(format!("message ready, {} bytes", message.len())),
        Err(e) => log.note(format!("failed: {e}")),
    }
    debug!(index, source = %source.display(), ok = outcome.is_ok(), "file prepared");

    FileTask {
        index,
        source,
        converted,
        log,
        outcome,
    }
}
