//! Workspace facade crate.
//!
//! Re-exports the individual workspace crates so a host can depend on
//! `catalog-ingest` alone. With the default `desktop-shims` feature the
//! reqwest-backed HTTP client is exposed as well.

pub use bridge_traits as bridge;
pub use core_auth as auth;
pub use core_ingest as ingest;
pub use core_runtime as runtime;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::ReqwestHttpClient;

pub use core_ingest::{Dataset, IngestPipeline, IngestReport, IngestRequest, OutputRow};
pub use core_runtime::config::IngestConfig;
