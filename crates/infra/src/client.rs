//! Per-client orchestrator
//!
//! A [`CarthooksClient`] owns one token manager, one token endpoint and one
//! API client. Two clients never share tokens.

use std::sync::Arc;

use carthooks_common::auth::{
    AuthorizeCodeRequest, AuthorizeUrlBuilder, OAuthConfig, RequestAuthenticator, TokenError,
    TokenManager, TokenManagerOptions, TokenSet,
};
use tracing::{info, instrument};

use crate::api::{ApiClient, ApiError};
use crate::config::{self, ClientSettings};
use crate::http::{HttpClientBuilder, HttpTokenEndpoint};

/// Carthooks API client with OAuth token lifecycle
pub struct CarthooksClient {
    settings: ClientSettings,
    token_manager: Arc<TokenManager<HttpTokenEndpoint>>,
    authorize: AuthorizeUrlBuilder,
    api: ApiClient<HttpTokenEndpoint>,
}

impl CarthooksClient {
    /// Build a client from settings and an optional OAuth configuration
    ///
    /// When `oauth` is `None` the `[oauth]` section of `settings` is used,
    /// without a refresh callback.
    ///
    /// # Errors
    /// Returns `ApiError::Config` for malformed URLs or when the HTTP client
    /// cannot be built.
    pub fn new(settings: ClientSettings, oauth: Option<OAuthConfig>) -> Result<Self, ApiError> {
        Self::with_options(settings, oauth, TokenManagerOptions::default())
    }

    /// Like [`new`](Self::new) with explicit refresh skew and exchange timeout
    ///
    /// # Errors
    /// Same as [`new`](Self::new).
    pub fn with_options(
        settings: ClientSettings,
        oauth: Option<OAuthConfig>,
        options: TokenManagerOptions,
    ) -> Result<Self, ApiError> {
        let http = HttpClientBuilder::from_settings(&settings.http)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HTTP client: {e}")))?;

        let token_url = settings.token_url()?;
        let authorize = AuthorizeUrlBuilder::new(settings.authorize_url()?.to_string());

        let oauth = oauth.or_else(|| settings.oauth.clone().map(|s| s.into_config(None)));
        let endpoint = HttpTokenEndpoint::new(http.clone(), token_url);
        let token_manager = Arc::new(TokenManager::with_options(endpoint, oauth, options));

        let api = ApiClient::new(
            http,
            settings.base_url.clone(),
            settings.http.timeout(),
            RequestAuthenticator::new(Arc::clone(&token_manager)),
        );

        info!(base_url = %settings.base_url, "Carthooks client created");

        Ok(Self { settings, token_manager, authorize, api })
    }

    /// Build a client from [`config::load`]
    ///
    /// # Errors
    /// Any configuration or construction error.
    pub fn from_config() -> Result<Self, ApiError> {
        Self::new(config::load()?, None)
    }

    /// Obtain the first token set
    ///
    /// With a user access token the user-context exchange is used, client
    /// credentials otherwise.
    ///
    /// # Errors
    /// See [`TokenManager::initialize`].
    #[instrument(skip(self, user_access_token), fields(user_context = user_access_token.is_some()))]
    pub async fn initialize_oauth(
        &self,
        user_access_token: Option<String>,
    ) -> Result<TokenSet, TokenError> {
        self.token_manager.initialize(user_access_token).await
    }

    /// Refresh the token set, regardless of `auto_refresh`
    ///
    /// # Errors
    /// See [`TokenManager::refresh`].
    #[instrument(skip(self))]
    pub async fn refresh_oauth_token(&self) -> Result<TokenSet, TokenError> {
        self.token_manager.refresh().await
    }

    /// # Errors
    /// See [`TokenManager::exchange_authorization_code`].
    #[instrument(skip(self, code))]
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenSet, TokenError> {
        self.token_manager.exchange_authorization_code(code, redirect_uri).await
    }

    /// URL to send the user to for the authorization-code flow
    #[must_use]
    pub fn oauth_authorize_url(&self, request: &AuthorizeCodeRequest) -> String {
        self.authorize.build(request)
    }

    #[must_use]
    pub fn get_current_tokens(&self) -> Option<TokenSet> {
        self.token_manager.get_current_tokens()
    }

    /// Replace the OAuth configuration; current tokens are kept
    pub fn set_oauth_config(&self, config: OAuthConfig) {
        self.token_manager.set_oauth_config(config);
    }

    #[must_use]
    pub fn get_oauth_config(&self) -> Option<OAuthConfig> {
        self.token_manager.get_oauth_config()
    }

    /// Authenticated JSON API client
    #[must_use]
    pub fn api(&self) -> &ApiClient<HttpTokenEndpoint> {
        &self.api
    }

    #[must_use]
    pub fn token_manager(&self) -> &Arc<TokenManager<HttpTokenEndpoint>> {
        &self.token_manager
    }

    #[must_use]
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }
}

impl std::fmt::Debug for CarthooksClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarthooksClient")
            .field("base_url", &self.settings.base_url)
            .field("state", &self.token_manager.state())
            .finish_non_exhaustive()
    }
}
