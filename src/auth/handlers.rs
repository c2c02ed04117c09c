use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument};

use super::{
    dto::{FormView, LoginForm, NoticeQuery, RegisterForm},
    extractors::{removal_cookie, session_cookie, SessionCookie},
};
use crate::{
    error::{notice_redirect, AppError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/toggle_theme", post(toggle_theme))
}

pub async fn register_page(Query(q): Query<NoticeQuery>) -> Json<FormView> {
    Json(FormView {
        page: "register",
        notice: q.notice,
    })
}

pub async fn login_page(Query(q): Query<NoticeQuery>) -> Json<FormView> {
    Json(FormView {
        page: "login",
        notice: q.notice,
    })
}

#[instrument(skip(state, form))]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    if form
        .confirm_password
        .as_deref()
        .is_some_and(|confirm| confirm != form.password)
    {
        return AppError::InvalidInput("Passwords don't match".into()).redirect_back("/register");
    }

    match state.credentials.register(&form.username, &form.password).await {
        Ok(_) => notice_redirect("/login", "Registration successful, please log in"),
        Err(e) => e.redirect_back("/register"),
    }
}

#[instrument(skip(state, previous, jar, form))]
pub async fn login(
    State(state): State<AppState>,
    previous: SessionCookie,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let user = match state.credentials.verify(&form.username, &form.password).await {
        Ok(u) => u,
        Err(e) => return e.redirect_back("/login"),
    };

    // never reuse a token the client arrived with
    if let Err(e) = state.sessions.end_session(previous.token()).await {
        return e.into_response();
    }
    let token = match state.sessions.begin_session(&user).await {
        Ok(t) => t,
        Err(e) => return e.into_response(),
    };

    info!(user_id = %user.id, username = %user.username, "user logged in");
    let jar = jar.add(session_cookie(&state.config.session, &token));
    (jar, Redirect::to("/")).into_response()
}

#[instrument(skip(state, cookie, jar))]
pub async fn logout(
    State(state): State<AppState>,
    cookie: SessionCookie,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    state.sessions.end_session(cookie.token()).await?;
    let jar = jar.remove(removal_cookie(&state.config.session));
    Ok((jar, Redirect::to("/login")))
}

#[instrument(skip(state, cookie))]
pub async fn toggle_theme(
    State(state): State<AppState>,
    cookie: SessionCookie,
) -> Result<Redirect, AppError> {
    state.sessions.toggle_theme(cookie.token()).await?;
    Ok(Redirect::to("/"))
}
