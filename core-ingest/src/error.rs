use crate::api::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    /// The reference did not resolve to a usable collection id
    #[error("Could not resolve collection reference: {reference}")]
    Resolution { reference: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Credentials are missing or were refused by the token endpoint
    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Ingestion cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl IngestError {
    /// Errors that end the whole run rather than one reference or batch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IngestError::Credentials(_) | IngestError::Cancelled | IngestError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
