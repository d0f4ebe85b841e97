//! In-memory holder for the current token set.

use std::time::Duration;

use parking_lot::RwLock;

use super::types::TokenSet;

/// Holds at most one [`TokenSet`].
///
/// Reads never block on network activity: the lock is only held for the
/// duration of a clone or a swap. A replaced set is never mixed with its
/// successor because `set` swaps the whole value.
#[derive(Debug, Default)]
pub struct TokenStore {
    current: RwLock<Option<TokenSet>>,
}

impl TokenStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current token set
    #[must_use]
    pub fn get(&self) -> Option<TokenSet> {
        self.current.read().clone()
    }

    /// Replace the current token set
    pub fn set(&self, tokens: TokenSet) {
        *self.current.write() = Some(tokens);
    }

    /// Drop the current token set, returning it
    pub fn clear(&self) -> Option<TokenSet> {
        self.current.write().take()
    }

    /// Current access token, if any
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.current.read().as_ref().map(|t| t.access_token.clone())
    }

    /// Current refresh token, if any
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.current.read().as_ref().and_then(|t| t.refresh_token.clone())
    }

    /// True iff the store is empty or `now + skew >= expires_at`.
    #[must_use]
    pub fn is_expired(&self, skew: Duration) -> bool {
        self.current.read().as_ref().map_or(true, |t| t.is_expired(skew))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.read().is_none()
    }
}
