//! Console output for a delivery run.

use kindlemail_core::progress::{format_progress, format_size};
use kindlemail_core::{FileReport, FileTask, Reporter, RunSummary};
use kindlemail_smtp::TransferProgress;
use std::io::Write;
use std::path::Path;

/// Prints pipeline events to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    in_progress: bool,
}

impl ConsoleReporter {
    fn end_progress_line(&mut self) {
        if self.in_progress {
            println!();
            self.in_progress = false;
        }
    }
}

impl Reporter for ConsoleReporter {
    fn session_ready(&mut self, attempts: u32) {
        if attempts > 1 {
            println!("Connected to mail server after {attempts} attempts.");
        } else {
            println!("Connected to mail server.");
        }
    }

    fn task_drained(&mut self, task: &FileTask) {
        println!();
        println!("-------- {} --------", task.source.display());
        for line in task.log.iter() {
            println!("  {line}");
        }
    }

    fn progress(&mut self, _source: &Path, progress: &TransferProgress) {
        print!(
            "\r  sent {} of {}",
            format_progress(progress),
            format_size(progress.total)
        );
        let _ = std::io::stdout().flush();
        self.in_progress = true;
    }

    fn finished(&mut self, report: &FileReport) {
        self.end_progress_line();
        match &report.outcome {
            Ok(done) => println!(
                "  delivered {} ({})",
                report.source.display(),
                format_progress(done)
            ),
            Err(e) => println!("  FAILED {}: {e}", report.source.display()),
        }
    }
}

/// Prints the final per-file status.
pub fn print_summary(summary: &RunSummary) {
    println!();
    for file in &summary.files {
        let status = if file.outcome.is_ok() { "sent" } else { "FAILED" };
        println!("{status:>6}  {}", file.source.display());
    }
    println!(
        "{} delivered, {} failed.",
        summary.delivered(),
        summary.failed()
    );
}
