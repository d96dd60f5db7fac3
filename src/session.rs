use crate::auth::AccountOutcome;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Local};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "ghg_session";
pub const DEFAULT_TTL_MINUTES: i64 = 8 * 60;

/// Authentication state of one browser session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated {
        user: String,
        since: DateTime<Local>,
    },
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn user(&self) -> Option<&str> {
        match self {
            Self::Authenticated { user, .. } => Some(user),
            Self::Anonymous => None,
        }
    }

    /// Only a granted login leaves the anonymous state; sign-up and recovery
    /// keep the viewer where they are.
    pub fn apply(self, outcome: &AccountOutcome) -> Self {
        match (self, outcome) {
            (Self::Anonymous, AccountOutcome::Granted { user }) => Self::Authenticated {
                user: user.clone(),
                since: Local::now(),
            },
            (state, _) => state,
        }
    }

    pub fn logout(self) -> Self {
        Self::Anonymous
    }
}

/// Live sessions keyed by the id stored in the session cookie. Anonymous
/// viewers have no entry; authenticated ones expire `ttl` after login.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(Duration::minutes(DEFAULT_TTL_MINUTES))
    }
}

impl SessionStore {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            ttl,
        }
    }

    fn is_live(&self, session: &Session, now: DateTime<Local>) -> bool {
        match session {
            Session::Authenticated { since, .. } => *since + self.ttl > now,
            Session::Anonymous => false,
        }
    }

    pub async fn current(&self, jar: &CookieJar) -> Session {
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Session::Anonymous;
        };
        let mut sessions = self.sessions.lock().await;
        let now = Local::now();
        let live = sessions
            .get(cookie.value())
            .filter(|session| self.is_live(session, now))
            .cloned();
        if live.is_none() {
            sessions.remove(cookie.value());
        }
        live.unwrap_or_default()
    }

    /// Stores an authenticated session and returns the cookie that names it.
    /// Expired sessions are pruned on the way in.
    pub async fn begin(&self, session: Session) -> Cookie<'static> {
        let id = Uuid::new_v4().to_string();
        let now = Local::now();
        {
            let mut sessions = self.sessions.lock().await;
            sessions.retain(|_, existing| self.is_live(existing, now));
            sessions.insert(id.clone(), session);
        }
        Cookie::build((SESSION_COOKIE, id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.ttl.num_seconds()))
            .build()
    }

    /// Drops the session named by the cookie and returns the jar with the
    /// cookie removed.
    pub async fn end(&self, jar: CookieJar) -> CookieJar {
        if let Some(cookie) = jar.get(SESSION_COOKIE) {
            self.sessions.lock().await.remove(cookie.value());
        }
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
