use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use time::Duration;

use super::config::DriveAuthConfig;
use super::cookies;
use super::error::AuthError;
use super::extractor::ActiveSession;
use super::state::AuthState;
use crate::oauth::decode_id_claims;
use crate::session::{SessionStore, SharedSession};

/// Create the Drive authorization router.
pub fn auth_routes(config: DriveAuthConfig) -> Router {
    let settings = config.settings;
    let auth_path = settings.auth_path.clone();
    let files_path = settings.files_path.clone();
    let profile_path = settings.profile_path.clone();

    let state = AuthState {
        auth: Arc::new(config.auth),
        resource: Arc::new(config.resource),
        sessions: Arc::new(SessionStore::new(Duration::days(settings.session_ttl_days))),
        settings,
    };

    Router::new()
        .route(&format!("{auth_path}/start"), get(start_flow))
        .route(&format!("{auth_path}/callback"), get(callback))
        .route(&files_path, get(list_files))
        .route(&profile_path, get(profile))
        .with_state(state)
}

// ── Flow start ─────────────────────────────────────────────────────

async fn start_flow(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    let (session, jar) = resume_or_create(&state, jar);

    let auth_req = state.auth.authorization_request();

    // state and nonce must be on the session before the redirect goes out
    {
        let mut session = session.lock().await;
        session.state = Some(auth_req.state.clone());
        session.nonce = Some(auth_req.nonce.clone());
    }

    tracing::debug!("authorization flow started");
    (jar, Redirect::to(&auth_req.url))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(PrivateCookieJar, Redirect), Response> {
    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or("Unknown error");
        tracing::warn!(error = %error, description = %desc, "OAuth2 error from provider");
        return Err(flow_error(&state.settings.error_redirect, error));
    }

    let (session, jar) = resume_or_create(&state, jar);

    // The state check is the CSRF defense; nothing touches the provider
    // until it passes.
    let stored_state = { session.lock().await.state.clone() };
    let state_matches = match (&stored_state, &params.state) {
        (Some(stored), Some(returned)) => stored == returned,
        _ => false,
    };
    if !state_matches {
        tracing::warn!("authorization state mismatch, restarting flow");
        let restart = format!("{}/start", state.settings.auth_path);
        return Ok((jar, Redirect::to(&restart)));
    }

    {
        let mut session = session.lock().await;
        session.authorized = true;
        session.state = None; // consumed
    }

    let code = params
        .code
        .ok_or_else(|| flow_error(&state.settings.error_redirect, "missing_code"))?;

    let tokens = state.auth.exchange_code(&code).await.map_err(|e| {
        tracing::error!(error = %e, "Token exchange failed");
        flow_error(&state.settings.error_redirect, "token_exchange_failed")
    })?;

    // The ID token must carry back the nonce stored at flow start.
    if let Some(id_token) = &tokens.id_token {
        let claims = decode_id_claims(id_token).map_err(|e| {
            tracing::error!(error = %e, "ID token decoding failed");
            flow_error(&state.settings.error_redirect, "invalid_id_token")
        })?;
        let stored_nonce = { session.lock().await.nonce.clone() };
        if claims.nonce != stored_nonce {
            tracing::warn!("ID token nonce mismatch");
            return Err(flow_error(&state.settings.error_redirect, "nonce_mismatch"));
        }
    }

    {
        let mut session = session.lock().await;
        session.apply_exchange(&tokens);
        session.nonce = None;
    }

    // Profile resolution is best-effort: the flow is complete either way.
    match state.resource.fetch_profile(&tokens.access_token).await {
        Ok(Some(profile)) => {
            session.lock().await.profile = Some(profile);
        }
        Ok(None) => tracing::debug!("profile response had no user object"),
        Err(e) => tracing::warn!(error = %e, "Profile fetch failed"),
    }

    tracing::info!("authorization flow complete");
    Ok((jar, Redirect::to(&state.settings.login_redirect)))
}

// ── Files ──────────────────────────────────────────────────────────

async fn list_files(
    State(state): State<AuthState>,
    session: ActiveSession,
) -> Result<Json<Vec<JsonValue>>, AuthError> {
    let files = state
        .resource
        .list_files(&state.auth, &session.session)
        .await?;
    Ok(Json(files))
}

// ── Profile ────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileView {
    authorized: bool,
    email_address: Option<String>,
    photo_link: Option<String>,
    display_name: Option<String>,
}

async fn profile(session: ActiveSession) -> Json<ProfileView> {
    let session = session.session.lock().await;
    let profile = session.profile.as_ref();
    Json(ProfileView {
        authorized: session.authorized,
        email_address: profile.and_then(|p| p.email_address.clone()),
        photo_link: profile.and_then(|p| p.photo_link.clone()),
        display_name: profile.and_then(|p| p.display_name.clone()),
    })
}

// ── Helpers ────────────────────────────────────────────────────────

fn resume_or_create(state: &AuthState, jar: PrivateCookieJar) -> (SharedSession, PrivateCookieJar) {
    if let Some(session) = cookies::get_session_id(&jar, &state.settings.session_cookie_name)
        .and_then(|id| state.sessions.get(&id))
    {
        return (session, jar);
    }

    let (id, session) = state.sessions.create();
    let cookie = cookies::session_cookie(
        &state.settings.session_cookie_name,
        &id,
        state.settings.session_ttl_days,
        state.settings.secure_cookies,
    );
    (session, jar.add(cookie))
}

fn flow_error(error_redirect: &str, code: &str) -> Response {
    let encoded = urlencoding::encode(code);
    Redirect::to(&format!("{error_redirect}?error={encoded}")).into_response()
}
