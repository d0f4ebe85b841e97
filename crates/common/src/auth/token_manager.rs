//! Token manager with automatic refresh
//!
//! Manages the OAuth token lifecycle for one client:
//! - Initial issuance (client credentials or user-context exchange)
//! - Authorization-code exchange
//! - Manual and on-access refresh, falling back to the issuance grant when
//!   no refresh token is known
//! - Refresh callback dispatch for external persistence
//!
//! Every network exchange runs behind a single async gate, so at most one
//! exchange is in flight per manager. Callers that queued on the gate while
//! an exchange completed take its outcome instead of issuing another.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::TokenError;
use super::grant::Grant;
use super::store::TokenStore;
use super::traits::TokenEndpoint;
use super::types::{OAuthConfig, TokenSet};

/// Refresh this long before the access token actually expires.
pub const DEFAULT_REFRESH_SKEW: Duration = Duration::from_secs(60);

/// Upper bound on a single token endpoint call.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle state of a [`TokenManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// No token has been issued yet, or tokens were cleared
    Uninitialized,
    /// Issuance or authorization-code exchange in flight
    Initializing,
    /// Tokens available
    Ready,
    /// Refresh in flight
    Refreshing,
    /// Last exchange failed or was cancelled; not sticky
    Failed,
}

impl ManagerState {
    /// True while an exchange holds the gate
    #[must_use]
    pub fn is_exchanging(self) -> bool {
        matches!(self, Self::Initializing | Self::Refreshing)
    }
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Refreshing => "refreshing",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Tuning knobs for a [`TokenManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenManagerOptions {
    /// Treat tokens expiring within this window as stale
    pub refresh_skew: Duration,
    /// Abort an exchange that takes longer than this
    pub exchange_timeout: Duration,
}

impl Default for TokenManagerOptions {
    fn default() -> Self {
        Self { refresh_skew: DEFAULT_REFRESH_SKEW, exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeKind {
    Initialize,
    Refresh,
    AuthorizationCode,
}

impl ExchangeKind {
    fn in_flight_state(self) -> ManagerState {
        match self {
            Self::Initialize | Self::AuthorizationCode => ManagerState::Initializing,
            Self::Refresh => ManagerState::Refreshing,
        }
    }
}

#[derive(Debug)]
struct Completed {
    epoch: u64,
    kind: ExchangeKind,
    outcome: Result<TokenSet, TokenError>,
}

/// State only touched while holding the gate.
#[derive(Debug, Default)]
struct Gate {
    last: Option<Completed>,
    /// Grant that produced the current session, kept for fallback refresh.
    ///
    /// For a user-context session this holds the upstream user token in
    /// memory only. It never reaches a `TokenSet`, the callback or `Debug`
    /// output, and is dropped by `clear_tokens` and by an authorization-code
    /// exchange.
    issuance: Option<Grant>,
}

impl Gate {
    fn completed_since(&self, ticket: u64) -> Option<&Completed> {
        self.last.as_ref().filter(|done| done.epoch > ticket)
    }
}

/// Marks the manager `Failed` if an exchange future is dropped mid-flight.
struct InFlight<'a> {
    state: &'a RwLock<ManagerState>,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn begin(state: &'a RwLock<ManagerState>, kind: ExchangeKind) -> Self {
        *state.write() = kind.in_flight_state();
        Self { state, armed: true }
    }

    fn finish(mut self, next: ManagerState) {
        *self.state.write() = next;
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.state.write() = ManagerState::Failed;
            warn!("Token exchange cancelled before completion");
        }
    }
}

/// Token manager for one OAuth client
///
/// Owns the [`TokenStore`] and the current [`OAuthConfig`]. Reads of the
/// store never wait on the gate.
pub struct TokenManager<E> {
    endpoint: E,
    config: RwLock<Option<OAuthConfig>>,
    store: TokenStore,
    state: RwLock<ManagerState>,
    gate: Mutex<Gate>,
    epoch: AtomicU64,
    options: TokenManagerOptions,
}

impl<E: TokenEndpoint> TokenManager<E> {
    /// Create a token manager with default options
    ///
    /// # Arguments
    /// * `endpoint` - Token endpoint used for every exchange
    /// * `config` - OAuth configuration; operations needing OAuth fail with
    ///   [`TokenError::Configuration`] while this is `None`
    #[must_use]
    pub fn new(endpoint: E, config: Option<OAuthConfig>) -> Self {
        Self::with_options(endpoint, config, TokenManagerOptions::default())
    }

    /// Create a token manager with explicit skew and timeout
    #[must_use]
    pub fn with_options(
        endpoint: E,
        config: Option<OAuthConfig>,
        options: TokenManagerOptions,
    ) -> Self {
        Self {
            endpoint,
            config: RwLock::new(config),
            store: TokenStore::new(),
            state: RwLock::new(ManagerState::Uninitialized),
            gate: Mutex::new(Gate::default()),
            epoch: AtomicU64::new(0),
            options,
        }
    }

    /// Obtain the initial token set
    ///
    /// Uses the user-context exchange when `user_access_token` is given,
    /// client credentials otherwise. Callers arriving while an
    /// initialization is in flight receive its outcome.
    ///
    /// # Errors
    /// * [`TokenError::Configuration`] without a config; no request is made
    /// * [`TokenError::Network`] or [`TokenError::Auth`] from the exchange
    pub async fn initialize(&self, user_access_token: Option<String>) -> Result<TokenSet, TokenError> {
        self.config_snapshot()?;

        let ticket = self.epoch.load(Ordering::Acquire);
        let mut gate = self.gate.lock().await;

        if let Some(done) =
            gate.completed_since(ticket).filter(|done| done.kind == ExchangeKind::Initialize)
        {
            debug!("Joining initialization that completed while waiting");
            return done.outcome.clone();
        }

        let config = self.config_snapshot()?;
        let grant = match user_access_token.filter(|token| !token.trim().is_empty()) {
            Some(user_access_token) => Grant::UserContextExchange { user_access_token },
            None => Grant::ClientCredentials,
        };

        self.run_exchange(&mut gate, ExchangeKind::Initialize, grant, config).await
    }

    /// Refresh the token set on request
    ///
    /// Always permitted, whatever `auto_refresh` says. Uses the stored
    /// refresh token, then the configured seed, then re-runs the issuance
    /// grant.
    ///
    /// # Errors
    /// * [`TokenError::Configuration`] without a config; no request is made
    /// * [`TokenError::State`] when there is nothing to refresh from
    /// * [`TokenError::Network`] or [`TokenError::Auth`] from the exchange
    pub async fn refresh(&self) -> Result<TokenSet, TokenError> {
        self.config_snapshot()?;

        let ticket = self.epoch.load(Ordering::Acquire);
        let mut gate = self.gate.lock().await;

        if let Some(done) = gate.completed_since(ticket) {
            debug!("Taking outcome of exchange that completed while waiting");
            return done.outcome.clone();
        }

        let config = self.config_snapshot()?;
        let grant = self.refresh_grant(&gate, &config)?;
        self.run_exchange(&mut gate, ExchangeKind::Refresh, grant, config).await
    }

    /// Exchange an authorization code from the redirect callback
    ///
    /// Serialized with other exchanges but never coalesced: each code is
    /// presented exactly once. Success counts as a fresh initialization.
    ///
    /// # Errors
    /// * [`TokenError::Configuration`] without a config; no request is made
    /// * [`TokenError::Network`] or [`TokenError::Auth`] from the exchange
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenSet, TokenError> {
        self.config_snapshot()?;

        let mut gate = self.gate.lock().await;
        let config = self.config_snapshot()?;
        let grant = Grant::AuthorizationCode {
            code: code.to_string(),
            redirect_uri: redirect_uri.to_string(),
        };

        self.run_exchange(&mut gate, ExchangeKind::AuthorizationCode, grant, config).await
    }

    /// Access token for an outbound request
    ///
    /// With `auto_refresh` on, a token within the refresh skew is refreshed
    /// first; concurrent callers share one refresh. With it off, the stored
    /// token is returned until it actually expires.
    ///
    /// # Errors
    /// * [`TokenError::Configuration`] without a config
    /// * [`TokenError::State`] when no usable token exists and none can be
    ///   obtained automatically
    /// * Any refresh error
    pub async fn valid_access_token(&self) -> Result<String, TokenError> {
        let config = self.config_snapshot()?;
        let skew = self.options.refresh_skew;

        if let Some(tokens) = self.store.get().filter(|tokens| !tokens.is_expired(skew)) {
            return Ok(tokens.access_token);
        }
        if !config.auto_refresh {
            return self.stored_access_token();
        }

        let ticket = self.epoch.load(Ordering::Acquire);
        let mut gate = self.gate.lock().await;

        if let Some(tokens) = self.store.get().filter(|tokens| !tokens.is_expired(skew)) {
            return Ok(tokens.access_token);
        }
        if let Some(done) = gate.completed_since(ticket) {
            return done.outcome.clone().map(|tokens| tokens.access_token);
        }

        // auto_refresh may have been switched off while waiting
        let config = self.config_snapshot()?;
        if !config.auto_refresh {
            return self.stored_access_token();
        }

        let grant = self.refresh_grant(&gate, &config)?;
        debug!(grant = grant.kind(), "Access token stale; refreshing");

        self.run_exchange(&mut gate, ExchangeKind::Refresh, grant, config)
            .await
            .map(|tokens| tokens.access_token)
    }

    /// Refresh after the API rejected `rejected_access_token`
    ///
    /// If the stored token has already moved on, it is returned without a
    /// new exchange.
    ///
    /// # Errors
    /// Same as [`refresh`](Self::refresh).
    pub async fn refresh_rejected(&self, rejected_access_token: &str) -> Result<TokenSet, TokenError> {
        self.config_snapshot()?;

        let ticket = self.epoch.load(Ordering::Acquire);
        let mut gate = self.gate.lock().await;

        if let Some(tokens) = self.store.get().filter(|tokens| {
            tokens.access_token != rejected_access_token && !tokens.is_expired(Duration::ZERO)
        }) {
            debug!("Rejected token already replaced");
            return Ok(tokens);
        }
        if let Some(Completed { outcome: Err(err), .. }) = gate.completed_since(ticket) {
            return Err(err.clone());
        }

        let config = self.config_snapshot()?;
        let grant = self.refresh_grant(&gate, &config)?;
        info!(grant = grant.kind(), "Access token rejected; refreshing");

        self.run_exchange(&mut gate, ExchangeKind::Refresh, grant, config).await
    }

    /// Current token set without triggering a refresh
    #[must_use]
    pub fn get_current_tokens(&self) -> Option<TokenSet> {
        self.store.get()
    }

    #[must_use]
    pub fn state(&self) -> ManagerState {
        *self.state.read()
    }

    /// True if a token is stored and not yet expired
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.store.is_expired(Duration::ZERO)
    }

    /// Seconds until the stored token expires (negative once expired)
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.store.get().map(|tokens| tokens.seconds_until_expiry())
    }

    #[must_use]
    pub fn refresh_skew(&self) -> Duration {
        self.options.refresh_skew
    }

    /// Whether the current config allows automatic refresh
    #[must_use]
    pub fn auto_refresh_enabled(&self) -> bool {
        self.config.read().as_ref().is_some_and(|config| config.auto_refresh)
    }

    /// Replace the OAuth configuration
    ///
    /// Stored tokens are kept. An exchange already in flight finishes with
    /// the config (and callback) it started with.
    pub fn set_oauth_config(&self, config: OAuthConfig) {
        info!(
            client_id = %config.client_id,
            auto_refresh = config.auto_refresh,
            "OAuth config replaced"
        );
        *self.config.write() = Some(config);
    }

    /// Remove the OAuth configuration, returning it
    pub fn clear_oauth_config(&self) -> Option<OAuthConfig> {
        self.config.write().take()
    }

    #[must_use]
    pub fn get_oauth_config(&self) -> Option<OAuthConfig> {
        self.config.read().clone()
    }

    /// Forget the session
    ///
    /// Waits for any in-flight exchange, then empties the store and returns
    /// to `Uninitialized`.
    pub async fn clear_tokens(&self) {
        let mut gate = self.gate.lock().await;
        self.store.clear();
        gate.issuance = None;
        gate.last = None;
        *self.state.write() = ManagerState::Uninitialized;
        info!("OAuth tokens cleared");
    }

    /// The token endpoint this manager exchanges against
    #[must_use]
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Stored access token without refreshing; valid until actual expiry.
    fn stored_access_token(&self) -> Result<String, TokenError> {
        match self.store.get() {
            Some(tokens) if tokens.is_expired(Duration::ZERO) => Err(TokenError::State(
                "access token expired and auto_refresh is disabled".to_string(),
            )),
            Some(tokens) => Ok(tokens.access_token),
            None => Err(TokenError::State("no access token; initialize the client first".to_string())),
        }
    }

    fn config_snapshot(&self) -> Result<OAuthConfig, TokenError> {
        self.config.read().clone().ok_or_else(TokenError::missing_config)
    }

    fn refresh_grant(&self, gate: &Gate, config: &OAuthConfig) -> Result<Grant, TokenError> {
        let refresh_token = self
            .store
            .refresh_token()
            .or_else(|| config.seed_refresh_token().map(str::to_string));

        if let Some(refresh_token) = refresh_token {
            return Ok(Grant::RefreshToken { refresh_token });
        }

        gate.issuance.clone().ok_or_else(|| {
            TokenError::State("no refresh token and no issuance grant to fall back to".to_string())
        })
    }

    /// Run one exchange while holding the gate.
    ///
    /// Updates the store, then invokes the callback from `config`, before
    /// the caller releases the gate.
    async fn run_exchange(
        &self,
        gate: &mut Gate,
        kind: ExchangeKind,
        grant: Grant,
        config: OAuthConfig,
    ) -> Result<TokenSet, TokenError> {
        let in_flight = InFlight::begin(&self.state, kind);
        debug!(grant = grant.kind(), state = %kind.in_flight_state(), "Token exchange started");

        let timeout = self.options.exchange_timeout;
        let outcome = match tokio::time::timeout(timeout, grant.exchange(&self.endpoint, &config)).await
        {
            Ok(result) => result,
            Err(_) => Err(TokenError::Network(format!("token exchange timed out after {timeout:?}"))),
        };

        match &outcome {
            Ok(tokens) => {
                self.store.set(tokens.clone());
                match kind {
                    ExchangeKind::Initialize => gate.issuance = Some(grant.clone()),
                    ExchangeKind::AuthorizationCode => gate.issuance = None,
                    ExchangeKind::Refresh => {}
                }
                in_flight.finish(ManagerState::Ready);

                info!(
                    grant = grant.kind(),
                    expires_in = tokens.expires_in,
                    has_refresh_token = tokens.refresh_token.is_some(),
                    "OAuth token issued"
                );

                if let Some(callback) = &config.on_token_refresh {
                    callback(tokens);
                }
            }
            Err(err) => {
                in_flight.finish(ManagerState::Failed);
                warn!(grant = grant.kind(), error = err.label(), "Token exchange failed: {err}");
            }
        }

        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        gate.last = Some(Completed { epoch, kind, outcome: outcome.clone() });
        outcome
    }
}

impl<E> fmt::Debug for TokenManager<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("state", &*self.state.read())
            .field("has_tokens", &!self.store.is_empty())
            .field("config", &*self.config.read())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
