//! reqwest binding of the OAuth token endpoint.

use async_trait::async_trait;
use carthooks_common::auth::{OAuthErrorResponse, TokenEndpoint, TokenError, TokenResponse};
use reqwest::header::ACCEPT;
use reqwest::Client as ReqwestClient;
use tracing::{debug, warn};
use url::Url;

use super::client::describe_transport_error;

/// Posts grant forms to the authorization server's token URL
///
/// Status mapping:
/// - 2xx with a token body: success
/// - 5xx, transport failure or undecodable body: [`TokenError::Network`]
/// - any other status: [`TokenError::Auth`], carrying the OAuth error body
///   when present
#[derive(Debug, Clone)]
pub struct HttpTokenEndpoint {
    client: ReqwestClient,
    token_url: Url,
}

impl HttpTokenEndpoint {
    #[must_use]
    pub fn new(client: ReqwestClient, token_url: Url) -> Self {
        Self { client, token_url }
    }

    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn request_token(&self, form: &[(String, String)]) -> Result<TokenResponse, TokenError> {
        debug!(url = %self.token_url, "POST token request");

        let response = self
            .client
            .post(self.token_url.clone())
            .header(ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(|e| TokenError::Network(describe_transport_error(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TokenError::Network(describe_transport_error(&e)))?;

        if status.is_success() {
            return serde_json::from_str::<TokenResponse>(&body)
                .map_err(|e| TokenError::Network(format!("Undecodable token response: {e}")));
        }

        warn!(status = status.as_u16(), "Token endpoint returned an error status");

        if status.is_server_error() {
            return Err(TokenError::Network(format!("Token endpoint returned {status}")));
        }

        Err(match serde_json::from_str::<OAuthErrorResponse>(&body) {
            Ok(oauth_error) => TokenError::Auth(oauth_error.to_string()),
            Err(_) => TokenError::Auth(format!("Token endpoint returned {status}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::HttpClientBuilder;

    fn endpoint(server: &MockServer) -> HttpTokenEndpoint {
        let client = HttpClientBuilder::default()
            .timeout(Duration::from_millis(500))
            .build()
            .expect("client");
        let url = Url::parse(&format!("{}/oauth/token", server.uri())).expect("url");
        HttpTokenEndpoint::new(client, url)
    }

    fn form(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[tokio::test]
    async fn posts_form_and_decodes_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=dvc-client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "issued",
                "token_type": "Bearer",
                "expires_in": 7200,
                "scope": "items:read"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = endpoint(&server)
            .request_token(&form(&[
                ("grant_type", "client_credentials"),
                ("client_id", "dvc-client"),
                ("client_secret", "dvs-secret"),
            ]))
            .await
            .expect("token response");

        assert_eq!(response.access_token, "issued");
        assert_eq!(response.expires_in, Some(7200));
        assert_eq!(response.scope.as_deref(), Some("items:read"));
    }

    #[tokio::test]
    async fn encodes_special_characters_in_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("redirect_uri=https%3A%2F%2Fapp%2Fcb"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "issued" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = endpoint(&server)
            .request_token(&form(&[("grant_type", "authorization_code"), ("redirect_uri", "https://app/cb")]))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn maps_oauth_error_body_to_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "refresh token revoked"
            })))
            .mount(&server)
            .await;

        let err = endpoint(&server)
            .request_token(&form(&[("grant_type", "refresh_token")]))
            .await
            .unwrap_err();

        assert_eq!(err, TokenError::Auth("invalid_grant: refresh token revoked".into()));
    }

    #[tokio::test]
    async fn maps_unauthorized_without_body_to_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = endpoint(&server).request_token(&form(&[])).await.unwrap_err();
        assert!(matches!(err, TokenError::Auth(msg) if msg.contains("401")));
    }

    #[tokio::test]
    async fn maps_server_error_to_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = endpoint(&server).request_token(&form(&[])).await.unwrap_err();
        assert!(matches!(err, TokenError::Network(_)));
    }

    #[tokio::test]
    async fn maps_undecodable_body_to_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = endpoint(&server).request_token(&form(&[])).await.unwrap_err();
        assert!(matches!(err, TokenError::Network(msg) if msg.starts_with("Undecodable")));
    }

    #[tokio::test]
    async fn maps_timeout_to_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "late" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = endpoint(&server).request_token(&form(&[])).await.unwrap_err();
        assert_eq!(err, TokenError::Network("HTTP request timed out".into()));
    }
}
