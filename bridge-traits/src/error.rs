use thiserror::Error;

/// Transport-level failure. HTTP error statuses are not errors at this layer.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("HTTP transport failed: {0}")]
    OperationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Could not connect: {0}")]
    Connection(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
