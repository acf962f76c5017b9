//! Process-level plumbing shared by the ingestion crates.
//!
//! - [`config`]: [`IngestConfig`](config::IngestConfig), built in code or read
//!   from the environment, validated before any request is made
//! - [`logging`]: `tracing` subscriber setup and credential redaction

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
