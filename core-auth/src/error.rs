use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// The token endpoint refused the credentials (4xx)
    #[error("Credentials rejected by token endpoint ({status}): {body}")]
    CredentialsRejected { status: u16, body: String },

    #[error("Token request failed: {0}")]
    TokenRequestFailed(String),

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Auth error: {0}")]
    Other(String),
}

impl AuthError {
    /// True when retrying with the same credentials cannot succeed.
    pub fn is_credentials_error(&self) -> bool {
        matches!(self, AuthError::CredentialsRejected { .. })
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
