//! Native implementations of the bridge traits.
//!
//! [`ReqwestHttpClient`] is the transport the `catalog-ingest` binary hands to
//! `IngestPipeline::connect`:
//!
//! ```ignore
//! let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(timeout)?);
//! let pipeline = IngestPipeline::connect(config, http).await?;
//! ```

mod http;

pub use http::ReqwestHttpClient;
