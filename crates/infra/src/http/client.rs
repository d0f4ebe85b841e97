use std::time::Duration;

use reqwest::Client as ReqwestClient;

use crate::config::HttpSettings;

/// Builder for the shared reqwest client.
///
/// Requests are sent once; nothing in this crate retries on its own.
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<reqwest::header::HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), user_agent: None, default_headers: None }
    }
}

impl HttpClientBuilder {
    /// Start from loaded settings
    pub fn from_settings(settings: &HttpSettings) -> Self {
        Self::default().timeout(settings.timeout()).user_agent(settings.user_agent.clone())
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    /// # Errors
    /// Returns the reqwest error if the TLS backend cannot be initialised.
    pub fn build(self) -> Result<ReqwestClient, reqwest::Error> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout);

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        builder.build()
    }
}

/// Short, secret-free description of a transport failure.
pub(crate) fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return "HTTP request timed out".to_string();
    }

    #[cfg(not(target_arch = "wasm32"))]
    if err.is_connect() {
        return "HTTP connection failure".to_string();
    }

    if err.is_decode() {
        return format!("Failed to decode response body: {err}");
    }

    format!("HTTP request failed: {err}")
}
