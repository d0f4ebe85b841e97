//! Authenticated Carthooks API client
//!
//! Every request goes through the [`RequestAuthenticator`], so it carries a
//! bearer token that is fresh when sent and is retried at most once after a
//! 401.

use std::time::Duration;

use carthooks_common::auth::{RequestAuthenticator, TokenEndpoint};
use reqwest::header::ACCEPT;
use reqwest::{Client as ReqwestClient, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::errors::ApiError;
use crate::http::client::describe_transport_error;

/// API client bound to one token manager
pub struct ApiClient<E> {
    http: ReqwestClient,
    base_url: String,
    timeout: Duration,
    auth: RequestAuthenticator<E>,
}

impl<E> std::fmt::Debug for ApiClient<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<E: TokenEndpoint> ApiClient<E> {
    /// Create a new API client
    ///
    /// # Arguments
    ///
    /// * `http` - Shared reqwest client
    /// * `base_url` - API root; request paths are joined onto it
    /// * `timeout` - Upper bound for one attempt of a request
    /// * `auth` - Token decoration for every request
    #[must_use]
    pub fn new(
        http: ReqwestClient,
        base_url: impl Into<String>,
        timeout: Duration,
        auth: RequestAuthenticator<E>,
    ) -> Self {
        Self { http, base_url: base_url.into(), timeout, auth }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn authenticator(&self) -> &RequestAuthenticator<E> {
        &self.auth
    }

    /// Execute a GET request
    ///
    /// # Errors
    ///
    /// Returns error if no token can be obtained, the request fails, or the
    /// response cannot be deserialized
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Method::GET, path, None).await
    }

    /// Execute a POST request with a JSON body
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get), plus body serialization failures
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let body = Self::encode_body(body)?;
        self.send(Method::POST, path, Some(body)).await
    }

    /// Execute a PUT request with a JSON body
    ///
    /// # Errors
    ///
    /// Same as [`post`](Self::post)
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn put<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let body = Self::encode_body(body)?;
        self.send(Method::PUT, path, Some(body)).await
    }

    /// Execute a DELETE request
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get)
    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.send(Method::DELETE, path, None).await
    }

    async fn send<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<R, ApiError> {
        let url = self.url(path);
        let timeout = self.timeout;

        debug!(method = %method, url = %url, "API request");

        let response = self
            .auth
            .execute(|token| {
                let mut request = self
                    .http
                    .request(method.clone(), &url)
                    .bearer_auth(token)
                    .header(ACCEPT, "application/json");
                if let Some(body) = &body {
                    request = request.json(body);
                }
                let url = url.clone();

                async move {
                    let response = match tokio::time::timeout(timeout, request.send()).await {
                        Ok(Ok(resp)) => resp,
                        Ok(Err(err)) => return Err(Self::map_transport_error(&err, timeout)),
                        Err(_) => return Err(ApiError::Timeout(timeout)),
                    };

                    let status = response.status();
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(Self::map_status_error(status, &url, body));
                    }
                    Ok(response)
                }
            })
            .await?;

        let result = Self::decode(response).await?;
        info!(method = %method, path = %path, "API request successful");
        Ok(result)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, ApiError> {
        serde_json::to_value(body)
            .map_err(|e| ApiError::Client(format!("Failed to serialize body: {}", e)))
    }

    async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, ApiError> {
        let status = response.status();

        // 204/205 carry no body
        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                ApiError::Client(format!(
                    "No content response ({}), but response type cannot be deserialized from empty body",
                    status.as_u16()
                ))
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Client(format!("Failed to parse response: {}", e)))
    }

    fn map_status_error(status: StatusCode, url: &str, body: String) -> ApiError {
        let message = if body.is_empty() {
            format!("{} returned status {}", url, status)
        } else {
            format!("{} returned status {}: {}", url, status, body)
        };

        if status == StatusCode::UNAUTHORIZED {
            ApiError::Unauthorized(message)
        } else if status == StatusCode::FORBIDDEN {
            ApiError::Auth(message)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            ApiError::RateLimit(message)
        } else if status.is_server_error() {
            ApiError::Server(message)
        } else if status.is_client_error() {
            ApiError::Client(message)
        } else {
            ApiError::Network(message)
        }
    }

    fn map_transport_error(err: &reqwest::Error, timeout: Duration) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(timeout)
        } else {
            ApiError::Network(describe_transport_error(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use carthooks_common::auth::{OAuthConfig, TokenError, TokenManager};
    use carthooks_common::testing::MockTokenEndpoint;
    use serde::Deserialize;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::HttpClientBuilder;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u64,
        title: String,
    }

    async fn client_for(
        server: &MockServer,
        endpoint: &MockTokenEndpoint,
    ) -> ApiClient<MockTokenEndpoint> {
        client_with_config(server, endpoint, OAuthConfig::new("dvc-client", "dvs-secret")).await
    }

    async fn client_with_config(
        server: &MockServer,
        endpoint: &MockTokenEndpoint,
        config: OAuthConfig,
    ) -> ApiClient<MockTokenEndpoint> {
        let manager = Arc::new(TokenManager::new(endpoint.clone(), Some(config)));
        manager.initialize(None).await.unwrap();

        let http = HttpClientBuilder::default().build().unwrap();
        ApiClient::new(
            http,
            format!("{}/v1/", server.uri()),
            Duration::from_millis(500),
            RequestAuthenticator::new(manager),
        )
    }

    #[tokio::test]
    async fn test_get_attaches_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/items/7"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": 7, "title": "Invoice" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = MockTokenEndpoint::new();
        let client = client_for(&server, &endpoint).await;

        let item: Item = client.get("/items/7").await.unwrap();
        assert_eq!(item, Item { id: 7, title: "Invoice".into() });
    }

    #[tokio::test]
    async fn test_post_and_put_send_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/items"))
            .and(body_json(json!({ "title": "Invoice" })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({ "id": 8, "title": "Invoice" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/items/8"))
            .and(body_json(json!({ "title": "Receipt" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": 8, "title": "Receipt" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = MockTokenEndpoint::new();
        let client = client_for(&server, &endpoint).await;

        let created: Item = client.post("items", &json!({ "title": "Invoice" })).await.unwrap();
        assert_eq!(created.id, 8);

        let updated: Item = client.put("items/8", &json!({ "title": "Receipt" })).await.unwrap();
        assert_eq!(updated.title, "Receipt");
    }

    #[tokio::test]
    async fn test_delete_with_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/items/8"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = MockTokenEndpoint::new();
        let client = client_for(&server, &endpoint).await;

        let result: Option<Item> = client.delete("/items/8").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_no_content_into_struct_is_client_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let endpoint = MockTokenEndpoint::new();
        let client = client_for(&server, &endpoint).await;

        let err = client.get::<Item>("/items/8").await.unwrap_err();
        assert!(matches!(err, ApiError::Client(_)));
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_once_and_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/items/7"))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/items/7"))
            .and(header("authorization", "Bearer access-2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": 7, "title": "Invoice" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = MockTokenEndpoint::new();
        let client = client_for(&server, &endpoint).await;

        let item: Item = client.get("/items/7").await.unwrap();
        assert_eq!(item.id, 7);
        assert_eq!(endpoint.call_count(), 2);
    }

    #[tokio::test]
    async fn test_second_unauthorized_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token revoked"))
            .expect(2)
            .mount(&server)
            .await;

        let endpoint = MockTokenEndpoint::new();
        let client = client_for(&server, &endpoint).await;

        let err = client.get::<Item>("/items/7").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(ref msg) if msg.contains("token revoked")));
        assert_eq!(endpoint.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_without_auto_refresh_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = MockTokenEndpoint::new();
        let config = OAuthConfig::new("dvc-client", "dvs-secret").with_auto_refresh(false);
        let client = client_with_config(&server, &endpoint, config).await;

        let err = client.get::<Item>("/items/7").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert_eq!(endpoint.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_after_unauthorized_surfaces_token_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = MockTokenEndpoint::new();
        let client = client_for(&server, &endpoint).await;
        endpoint.push_error(TokenError::Auth("invalid_client".into()));

        let err = client.get::<Item>("/items/7").await.unwrap_err();
        assert!(matches!(err, ApiError::Token(TokenError::Auth(_))));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        let routes: [(u16, &str); 4] =
            [(403, "/v1/forbidden"), (404, "/v1/missing"), (429, "/v1/busy"), (502, "/v1/down")];
        for (status, route) in routes {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;
        }

        let endpoint = MockTokenEndpoint::new();
        let client = client_for(&server, &endpoint).await;

        let forbidden = client.get::<Item>("forbidden").await.unwrap_err();
        assert!(matches!(forbidden, ApiError::Auth(_)));
        assert!(!forbidden.should_retry());

        assert!(matches!(client.get::<Item>("missing").await.unwrap_err(), ApiError::Client(_)));
        assert!(matches!(client.get::<Item>("busy").await.unwrap_err(), ApiError::RateLimit(_)));

        let down = client.get::<Item>("down").await.unwrap_err();
        assert!(matches!(down, ApiError::Server(_)));
        assert!(down.should_retry());

        // 403 never triggers a refresh
        assert_eq!(endpoint.call_count(), 1);
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": 1, "title": "late" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let endpoint = MockTokenEndpoint::new();
        let client = client_for(&server, &endpoint).await;

        let err = client.get::<Item>("/items/1").await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_no_token_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let endpoint = MockTokenEndpoint::new();
        let manager = Arc::new(TokenManager::new(endpoint.clone(), None));
        let client = ApiClient::new(
            HttpClientBuilder::default().build().unwrap(),
            server.uri(),
            Duration::from_secs(1),
            RequestAuthenticator::new(manager),
        );

        let err = client.get::<serde_json::Value>("/items").await.unwrap_err();
        assert!(matches!(err, ApiError::Token(TokenError::Configuration(_))));
        assert_eq!(endpoint.call_count(), 0);
    }
}
