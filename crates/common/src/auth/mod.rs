//! OAuth 2.0 token lifecycle
//!
//! Obtains, caches and refreshes bearer tokens for one API client, and hands
//! them to outbound calls.
//!
//! # Features
//!
//! - **Grant flows**: client credentials, client credentials with user
//!   context, authorization code, refresh token
//! - **Single gate**: at most one token exchange in flight per manager;
//!   concurrent callers share its outcome
//! - **Refresh callback**: `on_token_refresh` runs after every issuance so
//!   callers can persist tokens
//! - **401 recovery**: one refresh-and-retry per request, never more
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ RequestAuthenticator │  Bearer token per call, 401 retry
//! └──────────┬───────────┘
//!            │
//!            └──► TokenManager     (state machine + gate + callback)
//!                      │
//!                      ├──► TokenStore     (current token set)
//!                      └──► Grant          (one exchange per call)
//!                               │
//!                               └──► TokenEndpoint (HTTP binding, injected)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use carthooks_common::auth::{
//!     OAuthConfig, RequestAuthenticator, TokenEndpoint, TokenError, TokenManager, TokenResponse,
//! };
//!
//! struct Endpoint;
//!
//! #[async_trait]
//! impl TokenEndpoint for Endpoint {
//!     async fn request_token(
//!         &self,
//!         _form: &[(String, String)],
//!     ) -> Result<TokenResponse, TokenError> {
//!         Err(TokenError::Network("not wired up".into()))
//!     }
//! }
//!
//! # async fn run() -> Result<(), TokenError> {
//! let config = OAuthConfig::new("client_id", "client_secret")
//!     .with_token_refresh_callback(|tokens| {
//!         // persist tokens.refresh_token somewhere durable
//!         let _ = tokens;
//!     });
//!
//! let manager = Arc::new(TokenManager::new(Endpoint, Some(config)));
//! manager.initialize(None).await?;
//!
//! let auth = RequestAuthenticator::new(Arc::clone(&manager));
//! let body = auth
//!     .execute(|token| async move { Ok::<_, TokenError>(format!("Bearer {token}")) })
//!     .await?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

pub mod authorize;
pub mod decorator;
pub mod error;
pub mod grant;
pub mod store;
pub mod token_manager;
pub mod traits;
pub mod types;

pub use authorize::{build_authorize_url, AuthorizeUrlBuilder};
pub use decorator::{RequestAuthenticator, UnauthorizedSignal};
pub use error::TokenError;
pub use grant::Grant;
pub use store::TokenStore;
pub use token_manager::{
    ManagerState, TokenManager, TokenManagerOptions, DEFAULT_EXCHANGE_TIMEOUT,
    DEFAULT_REFRESH_SKEW,
};
pub use traits::TokenEndpoint;
pub use types::{
    AuthorizeCodeRequest, OAuthConfig, OAuthErrorResponse, TokenRefreshCallback, TokenResponse,
    TokenSet, DEFAULT_EXPIRES_IN_SECS, MAX_EXPIRES_IN_SECS,
};
