//! Token sources
//!
//! The event store asks a [`TokenSource`] for the bearer token before every
//! request. Expiry and refresh are the source's business; the store only
//! reacts to a rejected token by surfacing an authentication error.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::{AuthError, Result};
use crate::types::{AccessToken, OAuthTokens};

/// Refresh tokens this long before they expire.
const REFRESH_BUFFER_SECS: i64 = 300;

/// Upper bound on a single refresh round-trip.
const REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Supplies the bearer token to present on the next request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a currently valid access token
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] when no usable credential is available.
    async fn current_token(&self) -> Result<AccessToken>;
}

#[async_trait]
impl<T: TokenSource + ?Sized> TokenSource for Arc<T> {
    async fn current_token(&self) -> Result<AccessToken> {
        (**self).current_token().await
    }
}

/// A token handed over by the host, used until the process exits.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: AccessToken,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn current_token(&self) -> Result<AccessToken> {
        if self.token.is_blank() {
            return Err(AuthError::NotAuthenticated);
        }
        Ok(self.token.clone())
    }
}

/// Exchanges a refresh token for a new token set.
///
/// Implemented by the host's identity library; the core never speaks the
/// token endpoint protocol itself.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens>;
}

/// Token source that refreshes shortly before expiry.
///
/// Concurrent callers share a single refresh: the token set sits behind an
/// async mutex held across the refresh call.
pub struct RefreshingTokenSource {
    tokens: Mutex<OAuthTokens>,
    refresher: Arc<dyn TokenRefresher>,
}

impl RefreshingTokenSource {
    pub fn new(tokens: OAuthTokens, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            tokens: Mutex::new(tokens),
            refresher,
        }
    }
}

#[async_trait]
impl TokenSource for RefreshingTokenSource {
    #[instrument(skip(self))]
    async fn current_token(&self) -> Result<AccessToken> {
        let mut tokens = self.tokens.lock().await;

        if !tokens.is_expired_with_buffer(REFRESH_BUFFER_SECS) {
            debug!("Token is valid, no refresh needed");
            return Ok(tokens.access_token());
        }

        let Some(refresh_token) = tokens.refresh_token.clone() else {
            warn!("Token expired and no refresh token is available");
            return Err(AuthError::TokenExpired);
        };

        info!("Token expired or expiring soon, refreshing");

        let mut refreshed = timeout(REFRESH_TIMEOUT, self.refresher.refresh(&refresh_token))
            .await
            .map_err(|_| AuthError::RefreshTimeout(REFRESH_TIMEOUT.as_secs()))??;

        // Some providers omit the refresh token when it did not rotate.
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = Some(refresh_token);
        }

        *tokens = refreshed;
        Ok(tokens.access_token())
    }
}
