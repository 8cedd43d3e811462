use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::AuthSettings;
use crate::oauth::AuthClient;
use crate::resource::ResourceClient;
use crate::session::SessionStore;

/// Shared state for auth route handlers.
#[derive(Clone)]
pub(super) struct AuthState {
    pub(super) auth: Arc<AuthClient>,
    pub(super) resource: Arc<ResourceClient>,
    pub(super) sessions: Arc<SessionStore>,
    pub(super) settings: AuthSettings,
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.settings.cookie_key.clone()
    }
}
