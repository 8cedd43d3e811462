use std::time::Duration;

use axum_extra::extract::cookie::Key;
use url::Url;

use super::error::AuthError;
use crate::oauth::{AuthClient, OAuthConfig};
use crate::resource::ResourceClient;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared auth settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl_days: i64,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) files_path: String,
    pub(crate) profile_path: String,
    pub(crate) login_redirect: String,
    pub(crate) error_redirect: String,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "__drive_session".into(),
            session_ttl_days: 30,
            secure_cookies: true,
            auth_path: "/auth".into(),
            files_path: "/files".into(),
            profile_path: "/profile".into(),
            login_redirect: "/".into(),
            error_redirect: "/".into(),
        }
    }
}

/// Drive authorization configuration.
///
/// Required fields arrive through the [`OAuthConfig`] constructor parameter —
/// no runtime "missing field" errors.
///
/// Use [`from_env()`](DriveAuthConfig::from_env) for convention-based setup,
/// or [`new()`](DriveAuthConfig::new) with `with_*` methods for full control.
pub struct DriveAuthConfig {
    pub(super) auth: AuthClient,
    pub(super) resource: ResourceClient,
    pub(super) settings: AuthSettings,
}

impl DriveAuthConfig {
    /// Create config from a pre-validated [`OAuthConfig`].
    ///
    /// All optional fields use sensible defaults. Override with `with_*`
    /// methods. The token and resource clients share one HTTP client with a
    /// bounded request timeout.
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("HTTP client construction");
        Self {
            auth: AuthClient::new(config.clone()).with_http_client(http.clone()),
            resource: ResourceClient::new(config).with_http_client(http),
            settings: AuthSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `DRIVE_CLIENT_ID`: OAuth2 client ID
    /// - `DRIVE_CLIENT_SECRET`: OAuth2 client secret
    /// - `DRIVE_REDIRECT_URI`: OAuth2 callback URI (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `DRIVE_AUTH_URL`: Override the authorization endpoint
    /// - `DRIVE_TOKEN_URL`: Override the token endpoint
    /// - `DRIVE_ABOUT_URL`: Override the profile (`about`) endpoint
    /// - `DRIVE_FILES_URL`: Override the files endpoint
    /// - `DRIVE_SCOPES`: Comma-separated OAuth2 scopes
    /// - `DEV_AUTH`: Set to `"1"` or `"true"` to disable secure cookies
    /// - `COOKIE_KEY`: Cookie encryption key bytes
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing or URLs
    /// are invalid.
    pub fn from_env() -> Result<Self, AuthError> {
        let client_id = std::env::var("DRIVE_CLIENT_ID")
            .map_err(|_| AuthError::Config("DRIVE_CLIENT_ID is required".into()))?;
        let client_secret = std::env::var("DRIVE_CLIENT_SECRET")
            .map_err(|_| AuthError::Config("DRIVE_CLIENT_SECRET is required".into()))?;
        let redirect_uri: Url = std::env::var("DRIVE_REDIRECT_URI")
            .map_err(|_| AuthError::Config("DRIVE_REDIRECT_URI is required".into()))?
            .parse()
            .map_err(|e| AuthError::Config(format!("DRIVE_REDIRECT_URI: {e}")))?;

        let mut config = OAuthConfig::new(client_id, client_secret, redirect_uri);

        if let Ok(url_str) = std::env::var("DRIVE_AUTH_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("DRIVE_AUTH_URL: {e}")))?;
            config = config.with_auth_url(url);
        }
        if let Ok(url_str) = std::env::var("DRIVE_TOKEN_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("DRIVE_TOKEN_URL: {e}")))?;
            config = config.with_token_url(url);
        }
        if let Ok(url_str) = std::env::var("DRIVE_ABOUT_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("DRIVE_ABOUT_URL: {e}")))?;
            config = config.with_about_url(url);
        }
        if let Ok(url_str) = std::env::var("DRIVE_FILES_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("DRIVE_FILES_URL: {e}")))?;
            config = config.with_files_url(url);
        }
        if let Ok(scopes) = std::env::var("DRIVE_SCOPES") {
            config = config.with_scopes(scopes.split(',').map(|s| s.trim().to_string()).collect());
        }

        let dev_auth = matches!(std::env::var("DEV_AUTH").as_deref(), Ok("1") | Ok("true"));

        let cookie_key = match std::env::var("COOKIE_KEY") {
            Ok(k) => Key::try_from(k.as_bytes()).map_err(|_| {
                AuthError::Config(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?,
            Err(_) => Key::generate(),
        };

        Ok(Self::new(config)
            .with_cookie_key(cookie_key)
            .with_secure_cookies(!dev_auth))
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.settings.session_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_files_path(mut self, path: impl Into<String>) -> Self {
        self.settings.files_path = path.into();
        self
    }

    #[must_use]
    pub fn with_profile_path(mut self, path: impl Into<String>) -> Self {
        self.settings.profile_path = path.into();
        self
    }

    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.login_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_error_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.error_redirect = path.into();
        self
    }
}
