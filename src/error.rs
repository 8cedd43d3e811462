/// Errors from the authorization and resource clients.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an OAuth2 `error` body.
    #[error("{operation}: provider returned \"{error}\"")]
    Provider {
        operation: &'static str,
        error: String,
        description: Option<String>,
    },

    /// Non-2xx response without a structured `error` body.
    #[error("{operation} failed with status {status}: {detail}")]
    Endpoint {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    #[error("{operation}: unexpected response body: {detail}")]
    Decode {
        operation: &'static str,
        detail: String,
    },

    /// The resource API rejected the bearer token.
    #[error("resource API rejected the access token: {0}")]
    TokenRejected(String),

    #[error("no refresh token stored for this session")]
    NoRefreshToken,

    #[error("no access token stored for this session")]
    NotAuthorized,

    #[error("ID token nonce does not match the session nonce")]
    NonceMismatch,

    #[error("malformed ID token: {0}")]
    IdToken(String),
}
