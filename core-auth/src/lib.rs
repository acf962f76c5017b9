//! # Authentication Module
//!
//! App-level credentials for the catalog API.
//!
//! ## Overview
//!
//! The catalog endpoints used by the ingestion pipeline only need an app
//! token obtained with the OAuth 2.0 client-credentials grant. This crate
//! issues that token, tracks its expiry and serializes refreshes so that a
//! burst of authorization failures across concurrent batches produces a
//! single call to the token endpoint.
//!
//! ## Features
//!
//! - Client-credentials token issuance with HTTP Basic auth
//! - Expiry tracking against an injectable [`Clock`](bridge_traits::time::Clock)
//! - Singleton refresh guarded by a `tokio::sync::Mutex`

pub mod error;
pub mod oauth;
pub mod provider;
pub mod types;

pub use error::{AuthError, Result};
pub use oauth::{ClientCredentialsConfig, ClientCredentialsFlow};
pub use provider::TokenProvider;
pub use types::AccessToken;
