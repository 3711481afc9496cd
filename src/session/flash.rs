/// One-shot notices carried across redirects
///
/// Stored in a cookie so they survive logout and session expiry, and
/// consumed by the next view that reads them.
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

const FLASH_COOKIE: &str = "portal_flash";

/// Notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Error,
}

/// A user-facing notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }
}

fn read(jar: &CookieJar) -> Vec<Notice> {
    jar.get(FLASH_COOKIE)
        .and_then(|c| urlencoding::decode(c.value()).ok().map(|v| v.into_owned()))
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

/// Queue a notice for the next view
pub fn push(jar: CookieJar, notice: Notice) -> CookieJar {
    let mut notices = read(&jar);
    notices.push(notice);

    let encoded = match serde_json::to_string(&notices) {
        Ok(json) => urlencoding::encode(&json).into_owned(),
        Err(e) => {
            tracing::warn!("Dropping notice that failed to serialize: {}", e);
            return jar;
        }
    };

    jar.add(
        Cookie::build((FLASH_COOKIE, encoded))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

/// Take all pending notices, clearing the cookie
pub fn take(jar: CookieJar) -> (CookieJar, Vec<Notice>) {
    let notices = read(&jar);
    if jar.get(FLASH_COOKIE).is_none() {
        return (jar, notices);
    }
    let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
    (jar, notices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reload(jar: &CookieJar) -> CookieJar {
        // Simulate the browser echoing the cookie on the next request
        let value = jar.get(FLASH_COOKIE).map(|c| c.value().to_string());
        match value {
            Some(v) => CookieJar::new().add(Cookie::new(FLASH_COOKIE, v)),
            None => CookieJar::new(),
        }
    }

    #[test]
    fn test_push_then_take() {
        let jar = push(CookieJar::new(), Notice::info("ログインしました"));
        let jar = push(jar, Notice::error("second; with=specials"));

        let (_, notices) = take(reload(&jar));
        assert_eq!(
            notices,
            vec![
                Notice::info("ログインしました"),
                Notice::error("second; with=specials"),
            ]
        );
    }

    #[test]
    fn test_take_on_empty_jar() {
        let (_, notices) = take(CookieJar::new());
        assert!(notices.is_empty());
    }

    #[test]
    fn test_garbage_cookie_is_ignored() {
        let jar = CookieJar::new().add(Cookie::new(FLASH_COOKIE, "%7Bnot-json"));
        let (_, notices) = take(jar);
        assert!(notices.is_empty());
    }
}
