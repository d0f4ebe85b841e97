//! Traits for token endpoint access
//!
//! The token manager depends only on [`TokenEndpoint`], so the HTTP binding
//! lives in the infra crate and tests substitute a scripted mock.

use async_trait::async_trait;

use super::error::TokenError;
use super::types::TokenResponse;

/// Trait for posting grant requests to the OAuth token endpoint
///
/// Implementations perform exactly one request per call and never retry.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Post a form-encoded grant request
    ///
    /// # Arguments
    /// * `form` - Ordered form fields, including `grant_type` and client
    ///   credentials
    ///
    /// # Returns
    /// The decoded token response
    ///
    /// # Errors
    /// * [`TokenError::Network`] on transport failure, server error or an
    ///   undecodable body
    /// * [`TokenError::Auth`] when the server rejects the grant
    async fn request_token(&self, form: &[(String, String)]) -> Result<TokenResponse, TokenError>;
}

/// Lets callers inject a shared endpoint.
#[async_trait]
impl<T: TokenEndpoint + ?Sized> TokenEndpoint for std::sync::Arc<T> {
    async fn request_token(&self, form: &[(String, String)]) -> Result<TokenResponse, TokenError> {
        (**self).request_token(form).await
    }
}
