/// Login, logout and landing redirects
use crate::{
    api::views::LoginView,
    auth::{cleared_session_cookie, session_cookie, LOGIN_PATH},
    context::AppContext,
    error::PortalError,
    session::{
        flash::{self, Notice},
        SESSION_COOKIE,
    },
};
use axum::{
    extract::State,
    response::Redirect,
    routing::get,
    Form, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

/// Build login routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/", get(root))
        .route(LOGIN_PATH, get(login_form).post(login))
        .route("/logout", get(logout))
}

async fn root() -> Redirect {
    Redirect::to(LOGIN_PATH)
}

async fn login_form(jar: CookieJar) -> (CookieJar, Json<LoginView>) {
    let (jar, notices) = flash::take(jar);
    (jar, Json(LoginView { notices }))
}

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// Check credentials and open a session
async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> (CookieJar, Redirect) {
    match ctx
        .authenticator
        .authenticate(&form.username, &form.password, ctx.now())
        .await
    {
        Ok(session) => {
            // Never reuse a session id issued before login
            if let Some(old) = jar.get(SESSION_COOKIE) {
                ctx.sessions.remove(old.value()).await;
            }

            let id = ctx.sessions.create(session).await;
            let jar = jar.add(session_cookie(id, ctx.config.session.cookie_secure));
            let jar = flash::push(jar, Notice::info("Logged in."));
            (jar, Redirect::to("/menu"))
        }
        Err(PortalError::Authentication(failure)) => {
            tracing::debug!("Login rejected: {}", failure);
            let jar = flash::push(jar, Notice::error("Incorrect username or password."));
            (jar, Redirect::to(LOGIN_PATH))
        }
        Err(e) => {
            tracing::error!("Login failed: {}", e);
            let message = match e {
                PortalError::Remote(remote) => format!("Login is unavailable: {}", remote),
                _ => "Login is unavailable, please try again later.".to_string(),
            };
            let jar = flash::push(jar, Notice::error(message));
            (jar, Redirect::to(LOGIN_PATH))
        }
    }
}

/// Destroy the session, if any
async fn logout(State(ctx): State<AppContext>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(id) = jar.get(SESSION_COOKIE) {
        if let Some(session) = ctx.sessions.remove(id.value()).await {
            tracing::info!("Agent {} logged out", session.user_id);
        }
    }

    let jar = flash::push(jar.remove(cleared_session_cookie()), Notice::info("Logged out."));
    (jar, Redirect::to(LOGIN_PATH))
}
