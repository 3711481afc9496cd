/// Agent authentication and the per-request session guard
use crate::{
    context::AppContext,
    crm::agent,
    error::{AuthFailure, PortalError, PortalResult},
    record_store::{field_str, Filter, QuerySpec, RecordStore},
    session::{
        flash::{self, Notice},
        GuardRejection, Session, SESSION_COOKIE,
    },
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;

pub const LOGIN_PATH: &str = "/login";

/// Checks agent credentials against the record store
pub struct Authenticator {
    store: Arc<dyn RecordStore>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Resolve `identifier` (partner id or display name) and check `secret`
    ///
    /// When several agents share an identifier the first record returned
    /// wins. The stored secret is compared as plain text, as the CRM keeps it.
    pub async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
        now: DateTime<FixedOffset>,
    ) -> PortalResult<Session> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(AuthFailure::NotFound.into());
        }

        let spec = QuerySpec::select(
            agent::OBJECT,
            &[
                agent::ID,
                agent::NAME,
                agent::PARTNER_ID,
                agent::SECRET,
                agent::COMPANY,
                agent::OWNER_REFERENCE,
            ],
        )
        .filter(Filter::Or(vec![
            Filter::eq(agent::PARTNER_ID, identifier),
            Filter::eq(agent::NAME, identifier),
        ]))
        .limit(2);

        let result = self.store.query(&spec).await?;
        if result.records.len() > 1 {
            tracing::warn!(
                "Login identifier {:?} matches several agents, using the first",
                identifier
            );
        }

        let record = result.records.first().ok_or_else(|| {
            tracing::info!("Login failed: no agent for {:?}", identifier);
            AuthFailure::NotFound
        })?;

        if field_str(record, agent::SECRET) != Some(secret) {
            tracing::info!("Login failed: bad secret for {:?}", identifier);
            return Err(AuthFailure::BadSecret.into());
        }

        let user_id = field_str(record, agent::ID).unwrap_or_default().to_string();
        Ok(Session {
            user_id,
            display_name: field_str(record, agent::NAME)
                .unwrap_or_default()
                .to_string(),
            external_login_id: field_str(record, agent::PARTNER_ID).map(str::to_string),
            company_name: field_str(record, agent::COMPANY)
                .unwrap_or_default()
                .to_string(),
            owner_reference: field_str(record, agent::OWNER_REFERENCE).map(str::to_string),
            last_activity: now,
        })
    }
}

/// Cookie carrying a freshly issued session id
pub fn session_cookie(id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie that clears the session id in the browser
pub fn cleared_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Session admitted by the guard, refreshed for this request
///
/// Every authenticated handler takes this extractor, so the expiry check
/// and refresh run before any handler logic.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub id: String,
    pub session: Session,
}

/// Redirect to the login view with a notice
pub struct LoginRedirect {
    jar: CookieJar,
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        (self.jar, Redirect::to(LOGIN_PATH)).into_response()
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for CurrentSession {
    type Rejection = LoginRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

        match state.sessions.guard(id.as_deref(), state.now()).await {
            Ok(session) => Ok(CurrentSession {
                // guard only admits a present id
                id: id.unwrap_or_default(),
                session,
            }),
            Err(rejection) => {
                let notice = match rejection {
                    GuardRejection::NotLoggedIn => Notice::error("Please log in."),
                    GuardRejection::Expired => {
                        Notice::error(PortalError::SessionExpired.to_string())
                    }
                };
                tracing::debug!("Session guard rejected {}: {:?}", parts.uri.path(), rejection);
                let jar = flash::push(jar.remove(cleared_session_cookie()), notice);
                Err(LoginRedirect { jar })
            }
        }
    }
}
