//! # kindlemail-core
//!
//! Delivery logic for kindlemail.
//!
//! This crate provides:
//! - Configuration loading and validation
//! - GBK detection and transcoding for plain-text input
//! - Text to HTML conversion
//! - Per-file preparation with an owned diagnostic log
//! - The delivery pipeline: session setup in parallel with preparation,
//!   then in-order transmission over a single SMTP session
//! - Throughput formatting for progress output

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod charset;
pub mod config;
mod error;
pub mod html;
pub mod pipeline;
pub mod progress;
pub mod task;

pub use config::Config;
pub use error::{Error, Result};
pub use html::Conversion;
pub use pipeline::{FileReport, Pipeline, Reporter, RunSummary};
pub use task::{FileTask, TaskLog};
