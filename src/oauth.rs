use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::random;

/// Identity-provider `OAuth2` configuration.
///
/// Required fields are constructor parameters — no runtime "missing field" errors.
///
/// ```rust,ignore
/// use drive_oidc::OAuthConfig;
///
/// let config = OAuthConfig::new(
///     "my-client-id",
///     "my-client-secret",
///     "https://my-app.com/auth/callback".parse()?,
/// );
/// // Optional overrides via chaining:
/// let config = config
///     .with_auth_url("https://custom.example.com/authorize".parse()?);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) about_url: Url,
    pub(crate) files_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
}

impl OAuthConfig {
    /// Create a new OAuth2 configuration.
    ///
    /// Required fields are parameters — compile-time enforcement, no `Result`.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri,
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth"
                .parse()
                .expect("valid default URL"),
            token_url: "https://oauth2.googleapis.com/token"
                .parse()
                .expect("valid default URL"),
            about_url: "https://www.googleapis.com/drive/v3/about"
                .parse()
                .expect("valid default URL"),
            files_url: "https://www.googleapis.com/drive/v3/files"
                .parse()
                .expect("valid default URL"),
            scopes: vec![
                "openid".into(),
                "profile".into(),
                "https://www.googleapis.com/auth/drive.metadata.readonly".into(),
            ],
        }
    }

    /// Override the authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the profile (`about`) endpoint.
    #[must_use]
    pub fn with_about_url(mut self, url: Url) -> Self {
        self.about_url = url;
        self
    }

    /// Override the file-listing endpoint.
    #[must_use]
    pub fn with_files_url(mut self, url: Url) -> Self {
        self.files_url = url;
        self
    }

    /// Override the OAuth2 scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// `OAuth2` client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Authorization endpoint URL.
    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    /// Token exchange endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Profile (`about`) endpoint URL.
    #[must_use]
    pub fn about_url(&self) -> &Url {
        &self.about_url
    }

    /// File-listing endpoint URL.
    #[must_use]
    pub fn files_url(&self) -> &Url {
        &self.files_url
    }

    /// `OAuth2` redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Requested `OAuth2` scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// Token-endpoint client for the identity provider.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

/// Authorization URL with the flow parameters to store in the session.
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub nonce: String,
}

/// Token response from the provider's token endpoint.
///
/// `authorization_code` grants carry all fields; `refresh_token` grants
/// usually omit `id_token` and `refresh_token`.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Claims read from an ID token's payload.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct IdClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
}

/// Decodes the claims of an ID token without verifying its signature.
///
/// No signature check: the token arrives directly in the token endpoint's
/// response over TLS, not from the browser.
///
/// # Errors
///
/// Returns [`Error::IdToken`] if the token is not a three-part JWT or its
/// payload is not base64url-encoded JSON.
pub fn decode_id_claims(id_token: &str) -> Result<IdClaims, Error> {
    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| Error::IdToken("not a JWT".into()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| Error::IdToken(format!("payload base64: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::IdToken(format!("payload JSON: {e}")))
}

impl AuthClient {
    /// Create a new token-endpoint client.
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Generate an authorization URL with fresh `state` and `nonce`.
    ///
    /// The caller must store both on the session before redirecting: `state`
    /// guards the callback, `nonce` is checked against the ID token later.
    #[must_use]
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let state = random::generate_state();
        let nonce = random::generate_nonce();
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("access_type", "offline")
            .append_pair("scope", &scope)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("state", &state)
            .append_pair("nonce", &nonce);

        AuthorizationRequest {
            url: url.into(),
            state,
            nonce,
        }
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, [`Error::Provider`] if the
    /// token endpoint returns an `error` body, or [`Error::Endpoint`] on any
    /// other non-2xx response.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        self.token_request("code exchange", &params).await
    }

    /// Obtain a new access token from a refresh token.
    ///
    /// The response usually omits `id_token` and `refresh_token`; callers
    /// must keep the stored refresh token when it is absent
    /// ([`Session::apply_refresh`](crate::session::Session::apply_refresh)).
    ///
    /// # Errors
    ///
    /// Same conditions as [`exchange_code`](Self::exchange_code). No retries
    /// happen at this layer.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        self.token_request("token refresh", &params).await
    }

    async fn token_request(
        &self,
        operation: &'static str,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, Error> {
        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // An `error` field marks a provider error regardless of HTTP status.
        if let Ok(err) = serde_json::from_str::<ProviderError>(&body) {
            return Err(Error::Provider {
                operation,
                error: err.error,
                description: err.error_description,
            });
        }
        if !status.is_success() {
            return Err(Error::Endpoint {
                operation,
                status: status.as_u16(),
                detail: body,
            });
        }
        serde_json::from_str::<TokenResponse>(&body).map_err(|e| Error::Decode {
            operation,
            detail: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_config() -> OAuthConfig {
        OAuthConfig::new(
            "test-client",
            "test-secret",
            "https://example.com/callback".parse().unwrap(),
        )
    }

    fn mock_config(server: &MockServer) -> OAuthConfig {
        test_config().with_token_url(format!("{}/token", server.uri()).parse().unwrap())
    }

    /// Unsigned JWT with the given payload, for claim decoding.
    fn fake_jwt(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{header}.{body}.sig")
    }

    #[test]
    fn test_authorization_request_parameters() {
        let client = AuthClient::new(test_config());
        let req = client.authorization_request();

        assert!(req.url.contains("response_type=code"));
        assert!(req.url.contains("client_id=test-client"));
        assert!(req.url.contains("access_type=offline"));
        assert!(req.url.contains(&format!("state={}", req.state)));
        assert!(req.url.contains(&format!("nonce={}", req.nonce)));
        assert!(!req.state.is_empty());
        assert!(!req.nonce.is_empty());
    }

    #[test]
    fn test_authorization_request_unique_per_call() {
        let client = AuthClient::new(test_config());
        let req1 = client.authorization_request();
        let req2 = client.authorization_request();

        assert_ne!(req1.state, req2.state);
        assert_ne!(req1.nonce, req2.nonce);
    }

    #[test]
    fn test_config_constructor() {
        let config = test_config();

        assert_eq!(config.client_id(), "test-client");
        assert_eq!(config.redirect_uri().as_str(), "https://example.com/callback");
        assert_eq!(
            config.auth_url().as_str(),
            "https://accounts.google.com/o/oauth2/v2/auth"
        );
        assert_eq!(config.scopes().len(), 3);
    }

    #[test]
    fn test_config_with_overrides() {
        let config = test_config()
            .with_auth_url("https://custom.example.com/authorize".parse().unwrap())
            .with_scopes(vec!["openid".into()]);

        assert_eq!(
            config.auth_url().as_str(),
            "https://custom.example.com/authorize"
        );
        assert_eq!(config.scopes(), &["openid"]);
    }

    #[test]
    fn test_decode_id_claims() {
        let token = fake_jwt(&json!({"sub": "u1", "nonce": "n-123"}));
        let claims = decode_id_claims(&token).unwrap();

        assert_eq!(claims.sub.as_deref(), Some("u1"));
        assert_eq!(claims.nonce.as_deref(), Some("n-123"));
        assert!(claims.email.is_none());
    }

    #[test]
    fn test_decode_id_claims_rejects_garbage() {
        assert!(decode_id_claims("not-a-jwt").is_err());
        assert!(decode_id_claims("a.!!!.c").is_err());
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=validcode"))
            .and(body_string_contains("client_secret=test-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "AT1",
                "refresh_token": "RT1",
                "id_token": "header.payload.sig",
                "scope": "openid",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AuthClient::new(mock_config(&server));
        let tokens = client.exchange_code("validcode").await.unwrap();

        assert_eq!(tokens.access_token, "AT1");
        assert_eq!(tokens.refresh_token.as_deref(), Some("RT1"));
        assert_eq!(tokens.scope.as_deref(), Some("openid"));
        assert_eq!(tokens.expires_in, Some(3600));
    }

    #[tokio::test]
    async fn test_exchange_code_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Code was already redeemed."
            })))
            .mount(&server)
            .await;

        let client = AuthClient::new(mock_config(&server));
        let err = client.exchange_code("stale").await.unwrap_err();

        match err {
            Error::Provider { error, description, .. } => {
                assert_eq!(error, "invalid_grant");
                assert_eq!(description.as_deref(), Some("Code was already redeemed."));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_omits_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=RT1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "AT2",
                "scope": "openid",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AuthClient::new(mock_config(&server));
        let tokens = client.refresh("RT1").await.unwrap();

        assert_eq!(tokens.access_token, "AT2");
        assert!(tokens.refresh_token.is_none());
        assert!(tokens.id_token.is_none());
    }
}
