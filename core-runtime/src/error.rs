use thiserror::Error;

/// Startup failures: bad settings or a required setting that is absent.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A required input (credentials, usually) was not provided
    #[error("Missing {capability}: {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
