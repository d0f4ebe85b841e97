//! OAuth 2.0 types and structures
//!
//! Defines the data model shared by grants, the token store and the token
//! manager: issued tokens, the token endpoint wire shapes, per-client OAuth
//! configuration and the authorization-code request.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::TokenError;

/// Lifetime applied when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Longest lifetime accepted from the token endpoint (ten years).
pub const MAX_EXPIRES_IN_SECS: i64 = 10 * 365 * 24 * 3600;

/// Callback invoked after every successful issuance or refresh.
///
/// Runs synchronously inside the refresh gate, after the store has been
/// updated. Callers typically persist the token set from here.
pub type TokenRefreshCallback = Arc<dyn Fn(&TokenSet) + Send + Sync>;

/// OAuth 2.0 access and refresh tokens with metadata
///
/// `expires_at` is always present: a token set is only ever built from an
/// issued access token and a lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// Bearer token for API authentication
    pub access_token: String,

    /// Refresh token for obtaining new access tokens
    /// Optional because client-credentials grants usually don't issue one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type (always "Bearer" for the Carthooks API)
    pub token_type: String,

    /// Access token lifetime in seconds as reported by the server
    pub expires_in: i64,

    /// Absolute expiration timestamp (UTC)
    pub expires_at: DateTime<Utc>,

    /// Granted scopes (space-separated)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenSet {
    /// Create a new `TokenSet` issued now
    ///
    /// # Arguments
    /// * `access_token` - The access token
    /// * `refresh_token` - Optional refresh token
    /// * `expires_in` - Token lifetime in seconds
    /// * `scope` - Optional space-separated scopes
    #[must_use]
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        scope: Option<String>,
    ) -> Self {
        Self::issued_at(access_token, refresh_token, expires_in, scope, Utc::now())
    }

    /// Create a `TokenSet` with an explicit issuance time
    ///
    /// Used when restoring persisted tokens whose original issuance time is
    /// known. `expires_in` is clamped to `0..=MAX_EXPIRES_IN_SECS`.
    #[must_use]
    pub fn issued_at(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        scope: Option<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let expires_in = expires_in.clamp(0, MAX_EXPIRES_IN_SECS);
        let expires_at = issued_at
            .checked_add_signed(chrono::Duration::seconds(expires_in))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
            expires_at,
            scope,
        }
    }

    /// Check if the access token is expired or will expire within `skew`
    ///
    /// True iff `now + skew >= expires_at`.
    #[must_use]
    pub fn is_expired(&self, skew: Duration) -> bool {
        Utc::now() + to_chrono(skew) >= self.expires_at
    }

    /// Seconds until expiration (negative once expired)
    #[must_use]
    pub fn seconds_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }

    /// Carry the previous refresh token over when the server did not rotate it.
    #[must_use]
    pub(crate) fn inherit_refresh_token(mut self, previous: Option<String>) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = previous;
        }
        self
    }
}

/// Convert a std duration into a chrono duration, saturating on overflow.
pub(crate) fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

/// OAuth token response from the authorization server
///
/// Standard OAuth 2.0 token response format (RFC 6749 §5.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl From<TokenResponse> for TokenSet {
    fn from(response: TokenResponse) -> Self {
        let expires_in = response
            .expires_in
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

        let mut tokens =
            Self::new(response.access_token, response.refresh_token, expires_in, response.scope);
        if let Some(token_type) = response.token_type.filter(|t| !t.is_empty()) {
            tokens.token_type = token_type;
        }
        tokens
    }
}

/// OAuth error response from the authorization server
///
/// Standard OAuth 2.0 error response format (RFC 6749 §5.2).
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthErrorResponse {}

/// Per-client OAuth configuration
///
/// One config drives exactly one [`TokenManager`](super::TokenManager) at a
/// time. Replacing it through `set_oauth_config` is atomic.
#[derive(Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Refresh automatically when a token is stale on access or rejected
    /// with a 401. Never blocks an explicit `refresh()`.
    pub auto_refresh: bool,

    /// Previously persisted refresh token to restore a session from
    pub refresh_token: Option<String>,

    /// Handler invoked after every successful issuance or refresh
    pub on_token_refresh: Option<TokenRefreshCallback>,
}

impl OAuthConfig {
    /// Create a configuration with auto-refresh enabled and no seed token
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auto_refresh: true,
            refresh_token: None,
            on_token_refresh: None,
        }
    }

    /// Enable or disable automatic refresh
    #[must_use]
    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    /// Seed a refresh token restored from external storage
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Register the token refresh handler
    #[must_use]
    pub fn with_token_refresh_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&TokenSet) + Send + Sync + 'static,
    {
        self.on_token_refresh = Some(Arc::new(callback));
        self
    }

    /// Check that the credentials required by every grant are present
    ///
    /// # Errors
    /// Returns [`TokenError::Configuration`] naming the first missing field.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.client_id.trim().is_empty() {
            return Err(TokenError::Configuration("client_id is required".to_string()));
        }
        if self.client_secret.trim().is_empty() {
            return Err(TokenError::Configuration("client_secret is required".to_string()));
        }
        Ok(())
    }

    /// The seed refresh token, ignoring blank values
    #[must_use]
    pub fn seed_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auto_refresh", &self.auto_refresh)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("on_token_refresh", &self.on_token_refresh.is_some())
            .finish()
    }
}

/// Parameters for the authorization-code redirect
///
/// Built per authorization attempt and consumed once to build a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeCodeRequest {
    pub client_id: String,
    pub redirect_uri: String,
    /// Caller-chosen opaque value echoed back on the callback
    pub state: String,
    /// Target tenant for platform-level multi-tenant clients
    pub target_tenant_id: Option<u64>,
}

impl AuthorizeCodeRequest {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            state: state.into(),
            target_tenant_id: None,
        }
    }

    #[must_use]
    pub fn with_target_tenant(mut self, tenant_id: u64) -> Self {
        self.target_tenant_id = Some(tenant_id);
        self
    }
}
