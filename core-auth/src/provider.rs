//! Shared access-token holder.
//!
//! Every API request asks the provider for a bearer token. The token lives
//! behind a `tokio::sync::Mutex`, so at most one issue or refresh call is in
//! flight at any time. A worker that saw an authorization failure passes the
//! token it used to [`TokenProvider::force_refresh`]; if another worker has
//! already replaced that token, the replacement is returned without a new
//! call to the token endpoint.

use crate::error::Result;
use crate::oauth::ClientCredentialsFlow;
use crate::types::AccessToken;
use bridge_traits::time::Clock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

pub struct TokenProvider {
    flow: ClientCredentialsFlow,
    clock: Arc<dyn Clock>,
    current: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(flow: ClientCredentialsFlow, clock: Arc<dyn Clock>) -> Self {
        Self {
            flow,
            clock,
            current: Mutex::new(None),
        }
    }

    /// Returns a valid token, issuing one if none is held or the held one expired.
    pub async fn access_token(&self) -> Result<AccessToken> {
        let mut guard = self.current.lock().await;

        if let Some(token) = guard.as_ref() {
            if !token.is_expired_at(self.clock.now()) {
                return Ok(token.clone());
            }
            debug!("Access token expired, issuing a new one");
        }

        let token = self.flow.request_token().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Replaces the held token after an authorization failure.
    ///
    /// `stale` is the bearer value the caller used. When the held token no
    /// longer matches it, a concurrent refresh already happened and the held
    /// token is returned as is.
    #[instrument(skip_all)]
    pub async fn force_refresh(&self, stale: Option<&str>) -> Result<AccessToken> {
        let mut guard = self.current.lock().await;

        if let (Some(held), Some(stale)) = (guard.as_ref(), stale) {
            if held.secret() != stale && !held.is_expired_at(self.clock.now()) {
                debug!("Token already refreshed by another worker");
                return Ok(held.clone());
            }
        }

        info!("Refreshing access token");
        let token = self.flow.request_token().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// The held token, if any, without contacting the token endpoint.
    pub async fn cached_token(&self) -> Option<AccessToken> {
        self.current.lock().await.clone()
    }
}
