use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Error;
use crate::oauth::{AuthClient, OAuthConfig};
use crate::session::SharedSession;

/// Display fields from the resource API's profile (`about`) endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Profile {
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub photo_link: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AboutResponse {
    #[serde(default)]
    user: Option<Profile>,
}

/// Client for the protected resource API.
///
/// Calls carry the session's access token; a rejection triggers one refresh
/// through [`AuthClient`] and one retry, never more.
pub struct ResourceClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl ResourceClient {
    /// Create a new resource API client.
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

    /// List the user's files with the session's access token.
    ///
    /// If the API rejects the token, the session's refresh token is redeemed
    /// and the listing is retried exactly once with the new access token.
    /// Without a refresh token the original rejection is surfaced as-is.
    ///
    /// # Errors
    ///
    /// [`Error::NotAuthorized`] when the session has no access token;
    /// [`Error::TokenRejected`] when the API rejects the token and no
    /// recovery is possible; refresh and transport failures pass through.
    pub async fn list_files(
        &self,
        auth: &AuthClient,
        session: &SharedSession,
    ) -> Result<Vec<JsonValue>, Error> {
        let access_token = session
            .lock()
            .await
            .access_token
            .clone()
            .ok_or(Error::NotAuthorized)?;

        match self.fetch_files(&access_token).await {
            Err(Error::TokenRejected(detail)) => {
                tracing::debug!(error = %detail, "access token rejected, attempting refresh");
                let fresh = match self.renew_access_token(auth, session, &access_token).await {
                    Ok(token) => token,
                    // cannot refresh: report the rejection that started this
                    Err(Error::NoRefreshToken) => return Err(Error::TokenRejected(detail)),
                    Err(e) => return Err(e),
                };
                self.fetch_files(&fresh).await
            }
            other => other,
        }
    }

    /// Fetch the user's profile from the `about` endpoint.
    ///
    /// Returns `Ok(None)` when the response carries no `user` object — the
    /// flow is still complete, the session just has no display fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure or [`Error::Endpoint`] on
    /// a non-2xx response.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<Option<Profile>, Error> {
        let mut url = self.config.about_url.clone();
        url.query_pairs_mut().append_pair("fields", "user");

        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Endpoint {
                operation: "profile fetch",
                status: status.as_u16(),
                detail,
            });
        }
        let about: AboutResponse = response.json().await.map_err(|e| Error::Decode {
            operation: "profile fetch",
            detail: e.to_string(),
        })?;
        Ok(about.user)
    }

    /// One GET of the files endpoint; no retry logic here.
    async fn fetch_files(&self, access_token: &str) -> Result<Vec<JsonValue>, Error> {
        let response = self
            .http
            .get(self.config.files_url.clone())
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // The API reports authorization failures as an `error` field in the
        // body, not necessarily as an HTTP status.
        match serde_json::from_str::<JsonValue>(&body) {
            Ok(value) => {
                if let Some(error) = value.get("error") {
                    return Err(Error::TokenRejected(render_error(error)));
                }
                if !status.is_success() {
                    return Err(Error::Endpoint {
                        operation: "file listing",
                        status: status.as_u16(),
                        detail: body,
                    });
                }
                Ok(value
                    .get("files")
                    .and_then(JsonValue::as_array)
                    .cloned()
                    .unwrap_or_default())
            }
            Err(_) => Err(Error::Endpoint {
                operation: "file listing",
                status: status.as_u16(),
                detail: body,
            }),
        }
    }

    /// Redeem the session's refresh token and return the new access token.
    ///
    /// Holds the session lock across the refresh, so concurrent callers for
    /// the same session wait instead of issuing duplicate refreshes. If an
    /// earlier caller already replaced the stale token, that token is
    /// returned without another provider round-trip.
    async fn renew_access_token(
        &self,
        auth: &AuthClient,
        session: &SharedSession,
        stale_token: &str,
    ) -> Result<String, Error> {
        let mut session = session.lock().await;

        if let Some(current) = &session.access_token {
            if current != stale_token {
                return Ok(current.clone());
            }
        }

        let refresh_token = session
            .refresh_token
            .clone()
            .ok_or(Error::NoRefreshToken)?;
        let tokens = auth.refresh(&refresh_token).await?;
        session.apply_refresh(&tokens);
        tracing::info!("access token refreshed");
        Ok(tokens.access_token)
    }
}

fn render_error(error: &JsonValue) -> String {
    match error {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
