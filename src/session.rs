use std::sync::Arc;

use dashmap::DashMap;
use derive_more::{Display, From, FromStr, Into};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::oauth::TokenResponse;
use crate::resource::Profile;

/// Server-side session identifier (ULID), delivered to the browser as an
/// encrypted cookie value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct SessionId(pub Ulid);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-user-agent flow and token state.
///
/// `state` and `nonce` are rewritten each time a new authorization flow
/// starts; the token fields are written only by the results of the token
/// endpoint ([`apply_exchange`](Self::apply_exchange) /
/// [`apply_refresh`](Self::apply_refresh)) and the callback handler.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// CSRF guard for the in-flight flow; cleared once the callback consumes it.
    pub state: Option<String>,
    /// Replay guard, checked against the ID token's `nonce` claim.
    pub nonce: Option<String>,
    /// Set once the callback's state check succeeds.
    pub authorized: bool,
    pub id_token: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    /// Declared access-token lifetime in seconds. Metadata only: staleness
    /// is signaled by the resource API, not tracked against the clock.
    pub expires_in: Option<u64>,
    /// Display fields from the profile endpoint; absent until resolved.
    pub profile: Option<Profile>,
}

impl Session {
    /// Write a code-exchange response into the session.
    ///
    /// Every token field is overwritten with the response's value, present
    /// or not — a fresh grant replaces whatever an earlier flow left behind.
    pub fn apply_exchange(&mut self, tokens: &TokenResponse) {
        self.id_token = tokens.id_token.clone();
        self.access_token = Some(tokens.access_token.clone());
        self.refresh_token = tokens.refresh_token.clone();
        self.scope = tokens.scope.clone();
        self.expires_in = tokens.expires_in;
    }

    /// Write a refresh response into the session.
    ///
    /// Only fields present in the response are written; in particular a
    /// stored `refresh_token` survives a response that omits one.
    pub fn apply_refresh(&mut self, tokens: &TokenResponse) {
        self.access_token = Some(tokens.access_token.clone());
        if let Some(id_token) = &tokens.id_token {
            self.id_token = Some(id_token.clone());
        }
        if let Some(refresh_token) = &tokens.refresh_token {
            self.refresh_token = Some(refresh_token.clone());
        }
        if let Some(scope) = &tokens.scope {
            self.scope = Some(scope.clone());
        }
        if let Some(expires_in) = tokens.expires_in {
            self.expires_in = Some(expires_in);
        }
    }
}

/// A session behind its own async lock.
///
/// Holding the lock across a refresh serializes concurrent refreshes for
/// the same session.
pub type SharedSession = Arc<Mutex<Session>>;

struct StoredSession {
    session: SharedSession,
    created_at: OffsetDateTime,
}

/// In-memory session store with TTL eviction.
///
/// Sessions end by expiry, not logout: an entry past its TTL is removed on
/// the next lookup.
pub struct SessionStore {
    sessions: DashMap<SessionId, StoredSession>,
    ttl: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Create a fresh session and return its ID and handle.
    pub fn create(&self) -> (SessionId, SharedSession) {
        let id = SessionId::new();
        let session: SharedSession = Arc::new(Mutex::new(Session::default()));
        self.sessions.insert(
            id,
            StoredSession {
                session: session.clone(),
                created_at: OffsetDateTime::now_utc(),
            },
        );
        (id, session)
    }

    /// Look up a live session, evicting it if its TTL has passed.
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<SharedSession> {
        let now = OffsetDateTime::now_utc();
        {
            let entry = self.sessions.get(id)?;
            if now < entry.created_at + self.ttl {
                return Some(entry.session.clone());
            }
        }
        self.sessions.remove(id);
        None
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
