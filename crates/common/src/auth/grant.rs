//! Grant strategies for obtaining tokens
//!
//! Each [`Grant`] variant turns into one form-encoded POST against the token
//! endpoint. Every variant carries the client credentials; the variants
//! differ only in `grant_type` and their extra fields.

use std::fmt;

use tracing::debug;

use super::error::TokenError;
use super::traits::TokenEndpoint;
use super::types::{OAuthConfig, TokenSet};

/// A way of obtaining a token set from the authorization server.
#[derive(Clone, PartialEq, Eq)]
pub enum Grant {
    /// Application-level token for the client itself
    ClientCredentials,

    /// Client credentials exchange scoped to an end user's existing access
    /// token
    UserContextExchange { user_access_token: String },

    /// Exchange of a one-time authorization code from the redirect flow
    AuthorizationCode { code: String, redirect_uri: String },

    /// Refresh of a previously issued token set
    RefreshToken { refresh_token: String },
}

impl Grant {
    /// The OAuth `grant_type` sent for this variant
    #[must_use]
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::ClientCredentials | Self::UserContextExchange { .. } => "client_credentials",
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken { .. } => "refresh_token",
        }
    }

    /// Short name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClientCredentials => "client_credentials",
            Self::UserContextExchange { .. } => "user_context",
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken { .. } => "refresh_token",
        }
    }

    /// Build the form fields for this grant
    ///
    /// Field order is stable: `grant_type`, `client_id`, `client_secret`,
    /// then the variant-specific fields.
    #[must_use]
    pub fn form_params(&self, config: &OAuthConfig) -> Vec<(String, String)> {
        let mut form = vec![
            ("grant_type".to_string(), self.grant_type().to_string()),
            ("client_id".to_string(), config.client_id.clone()),
            ("client_secret".to_string(), config.client_secret.clone()),
        ];

        match self {
            Self::ClientCredentials => {}
            Self::UserContextExchange { user_access_token } => {
                form.push(("user_access_token".to_string(), user_access_token.clone()));
            }
            Self::AuthorizationCode { code, redirect_uri } => {
                form.push(("code".to_string(), code.clone()));
                form.push(("redirect_uri".to_string(), redirect_uri.clone()));
            }
            Self::RefreshToken { refresh_token } => {
                form.push(("refresh_token".to_string(), refresh_token.clone()));
            }
        }

        form
    }

    /// Perform the grant with a single endpoint call
    ///
    /// A refresh response that omits `refresh_token` keeps the one that was
    /// presented.
    ///
    /// # Errors
    /// * [`TokenError::Configuration`] if `config` is missing credentials;
    ///   no request is made
    /// * Any error returned by the endpoint
    pub async fn exchange<E>(&self, endpoint: &E, config: &OAuthConfig) -> Result<TokenSet, TokenError>
    where
        E: TokenEndpoint + ?Sized,
    {
        config.validate()?;

        debug!(grant = self.kind(), client_id = %config.client_id, "Requesting token");

        let response = endpoint.request_token(&self.form_params(config)).await?;
        let tokens = TokenSet::from(response);

        Ok(match self {
            Self::RefreshToken { refresh_token } => {
                tokens.inherit_refresh_token(Some(refresh_token.clone()))
            }
            _ => tokens,
        })
    }
}

impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientCredentials => f.write_str("ClientCredentials"),
            Self::UserContextExchange { .. } => {
                f.debug_struct("UserContextExchange").field("user_access_token", &"<redacted>").finish()
            }
            Self::AuthorizationCode { redirect_uri, .. } => f
                .debug_struct("AuthorizationCode")
                .field("code", &"<redacted>")
                .field("redirect_uri", redirect_uri)
                .finish(),
            Self::RefreshToken { .. } => {
                f.debug_struct("RefreshToken").field("refresh_token", &"<redacted>").finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::auth::types::TokenResponse;

    /// Records every form and answers with a fixed response.
    struct RecordingEndpoint {
        response: TokenResponse,
        forms: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl RecordingEndpoint {
        fn new(refresh_token: Option<&str>) -> Self {
            Self {
                response: TokenResponse {
                    access_token: "issued".into(),
                    refresh_token: refresh_token.map(str::to_string),
                    token_type: Some("Bearer".into()),
                    expires_in: Some(7200),
                    scope: None,
                },
                forms: Mutex::new(Vec::new()),
            }
        }

        fn forms(&self) -> Vec<Vec<(String, String)>> {
            self.forms.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TokenEndpoint for RecordingEndpoint {
        async fn request_token(
            &self,
            form: &[(String, String)],
        ) -> Result<TokenResponse, TokenError> {
            self.forms.lock().unwrap().push(form.to_vec());
            Ok(self.response.clone())
        }
    }

    fn config() -> OAuthConfig {
        OAuthConfig::new("dvc-client", "dvs-secret")
    }

    fn field<'a>(form: &'a [(String, String)], name: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_grant_types() {
        assert_eq!(Grant::ClientCredentials.grant_type(), "client_credentials");
        assert_eq!(
            Grant::UserContextExchange { user_access_token: "u".into() }.grant_type(),
            "client_credentials"
        );
        assert_eq!(
            Grant::AuthorizationCode { code: "c".into(), redirect_uri: "r".into() }.grant_type(),
            "authorization_code"
        );
        assert_eq!(Grant::RefreshToken { refresh_token: "t".into() }.grant_type(), "refresh_token");
    }

    #[test]
    fn test_form_params_always_include_credentials() {
        let grants = [
            Grant::ClientCredentials,
            Grant::UserContextExchange { user_access_token: "user".into() },
            Grant::AuthorizationCode { code: "code".into(), redirect_uri: "https://app/cb".into() },
            Grant::RefreshToken { refresh_token: "rt".into() },
        ];

        for grant in grants {
            let form = grant.form_params(&config());
            assert_eq!(form[0].0, "grant_type");
            assert_eq!(field(&form, "client_id"), Some("dvc-client"));
            assert_eq!(field(&form, "client_secret"), Some("dvs-secret"));
        }
    }

    #[test]
    fn test_variant_specific_fields() {
        let user = Grant::UserContextExchange { user_access_token: "user-tok".into() }
            .form_params(&config());
        assert_eq!(field(&user, "user_access_token"), Some("user-tok"));

        let code = Grant::AuthorizationCode { code: "abc".into(), redirect_uri: "https://app/cb".into() }
            .form_params(&config());
        assert_eq!(field(&code, "code"), Some("abc"));
        assert_eq!(field(&code, "redirect_uri"), Some("https://app/cb"));

        let refresh = Grant::RefreshToken { refresh_token: "rt".into() }.form_params(&config());
        assert_eq!(field(&refresh, "refresh_token"), Some("rt"));
        assert_eq!(field(&refresh, "code"), None);
    }

    #[tokio::test]
    async fn test_exchange_makes_one_call() {
        let endpoint = RecordingEndpoint::new(Some("new-refresh"));
        let tokens = Grant::ClientCredentials.exchange(&endpoint, &config()).await.unwrap();

        assert_eq!(tokens.access_token, "issued");
        assert_eq!(tokens.expires_in, 7200);
        assert_eq!(endpoint.forms().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_keeps_old_refresh_token_when_not_rotated() {
        let endpoint = RecordingEndpoint::new(None);
        let tokens = Grant::RefreshToken { refresh_token: "old-rt".into() }
            .exchange(&endpoint, &config())
            .await
            .unwrap();

        assert_eq!(tokens.refresh_token.as_deref(), Some("old-rt"));
    }

    #[tokio::test]
    async fn test_refresh_adopts_rotated_refresh_token() {
        let endpoint = RecordingEndpoint::new(Some("rotated"));
        let tokens = Grant::RefreshToken { refresh_token: "old-rt".into() }
            .exchange(&endpoint, &config())
            .await
            .unwrap();

        assert_eq!(tokens.refresh_token.as_deref(), Some("rotated"));
    }

    #[tokio::test]
    async fn test_invalid_config_makes_no_call() {
        let endpoint = RecordingEndpoint::new(None);
        let result = Grant::ClientCredentials.exchange(&endpoint, &OAuthConfig::new("", "")).await;

        assert!(matches!(result, Err(TokenError::Configuration(_))));
        assert!(endpoint.forms().is_empty());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!(
            "{:?} {:?} {:?}",
            Grant::UserContextExchange { user_access_token: "user-secret".into() },
            Grant::AuthorizationCode { code: "code-secret".into(), redirect_uri: "https://app/cb".into() },
            Grant::RefreshToken { refresh_token: "rt-secret".into() },
        );

        assert!(!debug.contains("user-secret"));
        assert!(!debug.contains("code-secret"));
        assert!(!debug.contains("rt-secret"));
        assert!(debug.contains("https://app/cb"));
    }
}
