//! Token types exchanged with the accounts service.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;

/// Seconds before the real expiry at which a token is treated as expired.
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// Raw body of a successful token response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_expires_in() -> i64 {
    3600
}

/// An app access token with its expiry.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use core_auth::AccessToken;
///
/// let now = Utc::now();
/// let token = AccessToken::new("abc", now + Duration::minutes(30));
/// assert!(!token.is_expired_at(now));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    token_type: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            token_type: default_token_type(),
            expires_at,
        }
    }

    pub(crate) fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        Self {
            value: response.access_token,
            token_type: response.token_type,
            expires_at: issued_at + Duration::seconds(response.expires_in),
        }
    }

    /// The raw bearer value.
    pub fn secret(&self) -> &str {
        &self.value
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True if the token expires within [`EXPIRY_BUFFER_SECS`] of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_BUFFER_SECS) >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
