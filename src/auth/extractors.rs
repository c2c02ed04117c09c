use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::convert::Infallible;

use super::repo_types::User;
use super::session::SessionToken;
use crate::config::SessionConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Session token from the cookie, if the client sent one.
pub struct SessionCookie(pub Option<SessionToken>);

impl SessionCookie {
    pub fn token(&self) -> Option<&SessionToken> {
        self.0.as_ref()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionCookie {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(&state.config.session.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .map(SessionToken::from);
        Ok(SessionCookie(token))
    }
}

/// Authenticated user; Anonymous requests are redirected to the login page.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let SessionCookie(token) = SessionCookie::from_request_parts(parts, state)
            .await
            .unwrap_or(SessionCookie(None));
        let user = state.sessions.require(token.as_ref()).await?;
        Ok(CurrentUser(user))
    }
}

pub fn session_cookie(config: &SessionConfig, token: &SessionToken) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), token.as_str().to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .build()
}

pub fn removal_cookie(config: &SessionConfig) -> Cookie<'static> {
    Cookie::build(config.cookie_name.clone()).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, Request};

    async fn extract(cookie: Option<&str>, state: &AppState) -> SessionCookie {
        let mut builder = Request::builder().uri("/");
        if let Some(c) = cookie {
            builder = builder.header(COOKIE, c);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        SessionCookie::from_request_parts(&mut parts, state).await.unwrap()
    }

    #[tokio::test]
    async fn reads_token_from_configured_cookie() {
        let state = AppState::fake();
        let jar = extract(Some("other=1; session=abc123"), &state).await;
        assert_eq!(jar.token().map(SessionToken::as_str), Some("abc123"));
    }

    #[tokio::test]
    async fn missing_or_empty_cookie_is_none() {
        let state = AppState::fake();
        assert!(extract(None, &state).await.token().is_none());
        assert!(extract(Some("session="), &state).await.token().is_none());
    }

    #[test]
    fn session_cookie_is_http_only() {
        let state = AppState::fake();
        let token = SessionToken::from("abc".to_string());
        let cookie = session_cookie(&state.config.session, &token);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.value(), "abc");
    }
}
