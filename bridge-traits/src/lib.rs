//! Host capabilities the ingestion core depends on.
//!
//! - [`HttpClient`](http::HttpClient): send one request, get one response
//! - [`Clock`](time::Clock): wall time for token expiry and request spacing
//!
//! Implementations report every HTTP status as a response. Only transport
//! failures become a [`BridgeError`](error::BridgeError), and timeouts and
//! connection failures keep their own variants so callers can treat them as
//! transient. Both traits are `Send + Sync`; one client is shared by all batch
//! workers.
//!
//! ```ignore
//! use async_trait::async_trait;
//! use bridge_traits::error::Result;
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//!
//! struct CannedClient(HttpResponse);
//!
//! #[async_trait]
//! impl HttpClient for CannedClient {
//!     async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse> {
//!         Ok(self.0.clone())
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use time::{Clock, SystemClock};
