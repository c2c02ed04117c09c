use std::sync::Arc;

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument};

use super::repo_types::{Session, Theme, User};
use crate::error::{AppError, AppResult};
use crate::store::{SessionStore, UserStore};

const TOKEN_LEN: usize = 43;

/// Opaque client-held session identifier.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    fn generate() -> Self {
        let token: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// Tokens are credentials; keep them out of logs.
impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    ttl: Option<Duration>,
}

impl SessionManager {
    pub fn new(sessions: Arc<dyn SessionStore>, users: Arc<dyn UserStore>, ttl: Option<Duration>) -> Self {
        Self { sessions, users, ttl }
    }

    /// Call only after a successful credential check.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn begin_session(&self, user: &User) -> AppResult<SessionToken> {
        let now = OffsetDateTime::now_utc();
        if self.ttl.is_some() {
            let swept = self.sessions.delete_expired(now).await?;
            if swept > 0 {
                debug!(swept, "expired sessions removed");
            }
        }

        let token = SessionToken::generate();
        let session = Session {
            token: token.as_str().to_string(),
            user_id: user.id,
            theme: user.theme,
            created_at: now,
            expires_at: self.ttl.map(|ttl| now + ttl),
        };
        self.sessions.insert_session(&session).await?;
        info!("session started");
        Ok(token)
    }

    /// `None` means Anonymous. The stored user row decides the theme; a stale
    /// session copy is refreshed from it.
    pub async fn resolve(&self, token: Option<&SessionToken>) -> AppResult<Option<User>> {
        let Some(token) = token else {
            return Ok(None);
        };
        let Some(session) = self.sessions.get_session(token.as_str()).await? else {
            return Ok(None);
        };
        if session.is_expired(OffsetDateTime::now_utc()) {
            debug!(user_id = %session.user_id, "session expired");
            self.sessions.delete_session(token.as_str()).await?;
            return Ok(None);
        }
        let Some(user) = self.users.find_by_id(session.user_id).await? else {
            return Ok(None);
        };
        if session.theme != user.theme {
            self.sessions.set_session_theme(token.as_str(), user.theme).await?;
        }
        Ok(Some(user))
    }

    /// Like `resolve`, but Anonymous is an error.
    pub async fn require(&self, token: Option<&SessionToken>) -> AppResult<User> {
        self.resolve(token).await?.ok_or(AppError::Unauthenticated)
    }

    /// Idempotent.
    pub async fn end_session(&self, token: Option<&SessionToken>) -> AppResult<()> {
        if let Some(token) = token {
            self.sessions.delete_session(token.as_str()).await?;
            info!("session ended");
        }
        Ok(())
    }

    /// Flips the persisted theme and the session's cached copy.
    pub async fn toggle_theme(&self, token: Option<&SessionToken>) -> AppResult<Theme> {
        let user = self.require(token).await?;
        let theme = self
            .users
            .toggle_theme(user.id)
            .await?
            .ok_or(AppError::Unauthenticated)?;
        if let Some(token) = token {
            self.sessions.set_session_theme(token.as_str(), theme).await?;
        }
        info!(user_id = %user.id, theme = theme.as_str(), "theme toggled");
        Ok(theme)
    }
}
