//! Mock implementations of common traits
//!
//! Provides a scripted [`TokenEndpoint`] for exercising the token manager
//! and request authenticator without a network.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::{TokenEndpoint, TokenError, TokenResponse};

// Type aliases to reduce complexity
type ScriptedResponses = Arc<Mutex<VecDeque<Result<TokenResponse, TokenError>>>>;
type RequestLog = Arc<Mutex<Vec<Vec<(String, String)>>>>;

/// Mock token endpoint for testing
///
/// Scripted responses are consumed in order. Once the script is empty the
/// mock issues a fresh token per call: `access-<n>` with a one hour
/// lifetime, plus `refresh-<n>` for the `authorization_code` and
/// `refresh_token` grants. Clones share the script and the request log.
#[derive(Debug, Clone, Default)]
pub struct MockTokenEndpoint {
    responses: ScriptedResponses,
    requests: RequestLog,
    calls: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

impl MockTokenEndpoint {
    /// Create a new mock endpoint that issues tokens on demand
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response, so concurrent callers overlap
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a successful response
    pub fn push_response(&self, response: TokenResponse) {
        // SAFETY: Mutex poisoning is acceptable in test mocks - if a test panics,
        // the entire test fails anyway
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a successful response built from its common fields
    pub fn push_tokens(&self, access_token: &str, refresh_token: Option<&str>, expires_in: i64) {
        self.push_response(token_response(access_token, refresh_token, expires_in));
    }

    /// Queue a failure
    pub fn push_error(&self, error: TokenError) {
        // SAFETY: Mutex poisoning is acceptable in test mocks
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Number of `request_token` calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every form posted, in call order
    pub fn requests(&self) -> Vec<Vec<(String, String)>> {
        // SAFETY: Mutex poisoning is acceptable in test mocks
        self.requests.lock().unwrap().clone()
    }

    /// The most recent form posted
    pub fn last_request(&self) -> Option<Vec<(String, String)>> {
        self.requests().pop()
    }

    /// `grant_type` of every request, in call order
    pub fn grant_types(&self) -> Vec<String> {
        self.requests().iter().filter_map(|form| form_value(form, "grant_type")).collect()
    }
}

#[async_trait]
impl TokenEndpoint for MockTokenEndpoint {
    async fn request_token(&self, form: &[(String, String)]) -> Result<TokenResponse, TokenError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        // SAFETY: Mutex poisoning is acceptable in test mocks
        self.requests.lock().unwrap().push(form.to_vec());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = self.responses.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            let rotates = matches!(
                form_value(form, "grant_type").as_deref(),
                Some("authorization_code" | "refresh_token")
            );
            let refresh = format!("refresh-{call}");
            Ok(token_response(
                &format!("access-{call}"),
                rotates.then_some(refresh.as_str()),
                3600,
            ))
        })
    }
}

/// Build a bearer [`TokenResponse`]
pub fn token_response(access_token: &str, refresh_token: Option<&str>, expires_in: i64) -> TokenResponse {
    TokenResponse {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
        token_type: Some("Bearer".to_string()),
        expires_in: Some(expires_in),
        scope: None,
    }
}

/// Look up a field in a posted form
pub fn form_value(form: &[(String, String)], name: &str) -> Option<String> {
    form.iter().find(|(key, _)| key == name).map(|(_, value)| value.clone())
}
