//! `kindlemail` - send documents to a Kindle mailbox
//!
//! Plain-text files are converted to HTML first; every file is sent as its
//! own message over a single authenticated SMTP session.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod console;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use console::{ConsoleReporter, print_summary};
use kindlemail_core::config::{self, CONFIG_ENV};
use kindlemail_core::{Pipeline, RunSummary};
use kindlemail_smtp::TcpConnector;

#[derive(Parser, Debug)]
#[command(name = "kindlemail", version, about)]
struct Cli {
    /// Files to send.
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Configuration file.
    #[arg(short, long, value_name = "PATH", env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Exit without waiting for Enter.
    #[arg(long)]
    no_pause: bool,

    /// Verbose logging (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = match cli.verbose {
        0 => "kindlemail=info,kindlemail_core=info,kindlemail_smtp=warn",
        1 => "kindlemail=debug,kindlemail_core=debug,kindlemail_smtp=info",
        _ => "kindlemail=trace,kindlemail_core=trace,kindlemail_smtp=debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let code = if cli.files.is_empty() {
        println!("No file to send!");
        ExitCode::SUCCESS
    } else {
        match run(&cli).await {
            Ok(summary) => {
                print_summary(&summary);
                if summary.is_success() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(2)
                }
            }
            Err(e) => {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        }
    };

    if !cli.no_pause {
        pause();
    }
    code
}

async fn run(cli: &Cli) -> anyhow::Result<RunSummary> {
    let config = config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let pipeline = Pipeline::new(TcpConnector::new(), &config)?;

    info!(files = cli.files.len(), "Starting delivery");
    println!("Converting files...");
    let mut reporter = ConsoleReporter::default();
    let summary = pipeline
        .run(cli.files.clone(), &mut reporter)
        .await
        .context("Delivery aborted")?;
    Ok(summary)
}

fn pause() {
    println!("All done, press Enter to exit.");
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_files_and_flags() {
        let cli =
            Cli::try_parse_from(["kindlemail", "--no-pause", "-vv", "a.txt", "b.pdf"]).unwrap();
        assert_eq!(cli.files, vec![PathBuf::from("a.txt"), PathBuf::from("b.pdf")]);
        assert!(cli.no_pause);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_config_path() {
        let cli = Cli::try_parse_from(["kindlemail", "--config", "my.toml", "x.epub"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
        assert!(!cli.no_pause);
    }
}
