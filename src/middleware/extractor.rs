use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::Key;

use super::cookies;
use super::error::AuthError;
use super::state::AuthState;
use crate::session::{SessionId, SharedSession};

/// Live session extracted from the session cookie.
///
/// Use as an Axum extractor in route handlers. Returns `401 Unauthorized`
/// if no valid session exists.
///
/// # Example
///
/// ```rust,ignore
/// async fn files(session: ActiveSession) -> impl IntoResponse {
///     let authorized = session.session.lock().await.authorized;
///     format!("session {} authorized: {authorized}", session.id)
/// }
/// ```
pub struct ActiveSession {
    /// Session ID (from cookie).
    pub id: SessionId,
    /// The session record behind its lock.
    pub session: SharedSession,
}

impl FromRequestParts<AuthState> for ActiveSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar<Key> = PrivateCookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::Unauthenticated)?;

        let id = cookies::get_session_id(&jar, &state.settings.session_cookie_name)
            .ok_or(AuthError::Unauthenticated)?;

        let session = state.sessions.get(&id).ok_or(AuthError::SessionExpired)?;

        Ok(ActiveSession { id, session })
    }
}
