//! Client settings loaded from the environment or a config file.

use std::fmt;
use std::time::Duration;

use carthooks_common::auth::{OAuthConfig, TokenRefreshCallback};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::ApiError;

/// Production API host
pub const DEFAULT_BASE_URL: &str = "https://api.carthooks.com";
/// Token endpoint path, relative to the base URL
pub const DEFAULT_TOKEN_PATH: &str = "/open/api/oauth/token";
/// Authorize endpoint path, relative to the base URL
pub const DEFAULT_AUTHORIZE_PATH: &str = "/open/oauth/authorize";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything needed to build a [`CarthooksClient`](crate::CarthooksClient)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// API host, e.g. `https://api.carthooks.com`
    pub base_url: String,

    /// Token endpoint; a path is resolved against `base_url`, a full URL is
    /// used as-is
    #[serde(default = "default_token_path")]
    pub token_path: String,

    /// Authorize endpoint, resolved like `token_path`
    #[serde(default = "default_authorize_path")]
    pub authorize_path: String,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub oauth: Option<OAuthSettings>,
}

impl ClientSettings {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token_path: default_token_path(),
            authorize_path: default_authorize_path(),
            http: HttpSettings::default(),
            oauth: None,
        }
    }

    /// Absolute token endpoint URL
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the base URL or path is malformed.
    pub fn token_url(&self) -> Result<Url, ApiError> {
        self.resolve(&self.token_path)
    }

    /// Absolute authorize endpoint URL
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the base URL or path is malformed.
    pub fn authorize_url(&self) -> Result<Url, ApiError> {
        self.resolve(&self.authorize_path)
    }

    fn resolve(&self, path: &str) -> Result<Url, ApiError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Config(format!("Invalid base URL '{}': {e}", self.base_url)))?;
        base.join(path).map_err(|e| ApiError::Config(format!("Invalid endpoint path '{path}': {e}")))
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// reqwest client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl HttpSettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { timeout_secs: default_timeout_secs(), user_agent: default_user_agent() }
    }
}

/// OAuth client credentials as they appear in configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,

    #[serde(default = "default_auto_refresh")]
    pub auto_refresh: bool,

    /// Refresh token persisted by a previous session
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl OAuthSettings {
    /// Build the runtime OAuth configuration
    ///
    /// The refresh callback cannot come from a file, so it is supplied here.
    #[must_use]
    pub fn into_config(self, on_token_refresh: Option<TokenRefreshCallback>) -> OAuthConfig {
        let mut config =
            OAuthConfig::new(self.client_id, self.client_secret).with_auto_refresh(self.auto_refresh);
        config.refresh_token = self.refresh_token;
        config.on_token_refresh = on_token_refresh;
        config
    }
}

impl fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auto_refresh", &self.auto_refresh)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_string()
}

fn default_authorize_path() -> String {
    DEFAULT_AUTHORIZE_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    concat!("carthooks-rust/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_auto_refresh() -> bool {
    true
}
