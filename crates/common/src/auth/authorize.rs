//! Authorization-code redirect URL construction.

use super::types::AuthorizeCodeRequest;

/// Builds the URL a user is redirected to for the authorization-code flow.
///
/// Pure and deterministic: no network access and no validation of the
/// redirect URI, which the authorization server checks against its own
/// registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeUrlBuilder {
    endpoint: String,
}

impl AuthorizeUrlBuilder {
    /// Create a builder for the given authorize endpoint
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the redirect URL
    ///
    /// Parameters appear in the order `client_id`, `redirect_uri`, `state`,
    /// `response_type`, `target_tenant_id`, each value percent-encoded.
    #[must_use]
    pub fn build(&self, request: &AuthorizeCodeRequest) -> String {
        let tenant = request.target_tenant_id.map(|id| id.to_string());

        let mut params: Vec<(&str, &str)> = vec![
            ("client_id", &request.client_id),
            ("redirect_uri", &request.redirect_uri),
            ("state", &request.state),
            ("response_type", "code"),
        ];
        if let Some(tenant) = tenant.as_deref() {
            params.push(("target_tenant_id", tenant));
        }

        let query = params
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if !self.endpoint.contains('?') {
            "?"
        } else if self.endpoint.ends_with(['?', '&']) {
            ""
        } else {
            "&"
        };

        format!("{}{separator}{query}", self.endpoint)
    }
}

/// Shorthand for `AuthorizeUrlBuilder::new(endpoint).build(request)`.
#[must_use]
pub fn build_authorize_url(endpoint: &str, request: &AuthorizeCodeRequest) -> String {
    AuthorizeUrlBuilder::new(endpoint).build(request)
}
