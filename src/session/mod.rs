/// Agent sessions
///
/// Server-side session records keyed by an opaque cookie id, with an idle
/// timeout checked and refreshed on every authenticated request.

pub mod flash;

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "portal_session";

/// Authenticated agent state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub display_name: String,
    pub external_login_id: Option<String>,
    pub company_name: String,
    /// CRM owner assigned to accounts this agent creates; may be empty
    pub owner_reference: Option<String>,
    pub last_activity: DateTime<FixedOffset>,
}

/// Whether a session last active at `last_activity` has outlived `idle_timeout`
///
/// Exactly `idle_timeout` of inactivity is still valid.
pub fn is_expired(
    now: DateTime<FixedOffset>,
    last_activity: DateTime<FixedOffset>,
    idle_timeout: Duration,
) -> bool {
    now.signed_duration_since(last_activity) > idle_timeout
}

/// Why the guard refused a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRejection {
    /// No cookie, or the id is unknown to the store
    NotLoggedIn,
    /// The idle timeout elapsed; the session has been destroyed
    Expired,
}

/// In-process session store
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Store a new session and return its id
    ///
    /// Sessions already past the idle timeout are pruned here.
    pub async fn create(&self, session: Session) -> String {
        let id = Uuid::new_v4().to_string();
        let now = session.last_activity;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !is_expired(now, s.last_activity, self.idle_timeout));
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!("Pruned {} expired session(s)", pruned);
        }

        tracing::info!("Session created for agent {}", session.user_id);
        sessions.insert(id.clone(), session);
        id
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Destroy a session, returning it if it existed
    pub async fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Admit or reject a request carrying session id `id` at time `now`
    ///
    /// Expired sessions are destroyed; admitted sessions have their
    /// activity timestamp bumped to `now`.
    pub async fn guard(
        &self,
        id: Option<&str>,
        now: DateTime<FixedOffset>,
    ) -> Result<Session, GuardRejection> {
        let id = id.ok_or(GuardRejection::NotLoggedIn)?;

        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or(GuardRejection::NotLoggedIn)?;

        if is_expired(now, session.last_activity, self.idle_timeout) {
            tracing::info!(
                "Session for agent {} expired (last activity {})",
                session.user_id,
                session.last_activity
            );
            sessions.remove(id);
            return Err(GuardRejection::Expired);
        }

        session.last_activity = now;
        Ok(session.clone())
    }
}
