//! Bearer-token decoration for outbound API calls
//!
//! [`RequestAuthenticator`] hands a valid access token to each call and, on
//! a 401, refreshes once and retries once. A second 401 is returned to the
//! caller unchanged.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use super::error::TokenError;
use super::token_manager::TokenManager;
use super::traits::TokenEndpoint;

/// Lets the authenticator recognise an upstream authentication failure in
/// a caller's error type.
pub trait UnauthorizedSignal {
    /// True for an HTTP 401 or its equivalent
    fn is_unauthorized(&self) -> bool;
}

impl UnauthorizedSignal for TokenError {
    fn is_unauthorized(&self) -> bool {
        false
    }
}

/// Wraps outbound calls with token acquisition and 401 recovery
pub struct RequestAuthenticator<E> {
    manager: Arc<TokenManager<E>>,
}

impl<E> Clone for RequestAuthenticator<E> {
    fn clone(&self) -> Self {
        Self { manager: Arc::clone(&self.manager) }
    }
}

impl<E> std::fmt::Debug for RequestAuthenticator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAuthenticator").field("manager", &self.manager).finish()
    }
}

impl<E: TokenEndpoint> RequestAuthenticator<E> {
    #[must_use]
    pub fn new(manager: Arc<TokenManager<E>>) -> Self {
        Self { manager }
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<TokenManager<E>> {
        &self.manager
    }

    /// Run `call` with a bearer token
    ///
    /// The token is refreshed first when stale and `auto_refresh` is on. If
    /// `call` fails with an unauthorized error and `auto_refresh` is on, the
    /// token is refreshed once and `call` runs exactly once more.
    ///
    /// # Errors
    /// * Token acquisition or refresh errors, converted into `Err`
    /// * Whatever `call` returns, including a repeated 401
    pub async fn execute<T, Err, F, Fut>(&self, mut call: F) -> Result<T, Err>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, Err>>,
        Err: From<TokenError> + UnauthorizedSignal,
    {
        let token = self.manager.valid_access_token().await?;

        match call(token.clone()).await {
            Err(err) if err.is_unauthorized() && self.manager.auto_refresh_enabled() => {
                debug!("Request unauthorized; refreshing token and retrying once");
                let refreshed = match self.manager.refresh_rejected(&token).await {
                    Ok(tokens) => tokens,
                    Err(refresh_err) => {
                        warn!(error = refresh_err.label(), "Refresh after 401 failed");
                        return Err(refresh_err.into());
                    }
                };
                call(refreshed.access_token).await
            }
            other => other,
        }
    }
}
