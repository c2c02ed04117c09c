use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    routing::{get, post},
    Form, Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{AddTaskForm, SearchQuery, TaskListView};
use super::repo_types::{StatusFilter, Task};
use crate::{
    auth::{
        dto::NoticeQuery,
        extractors::{CurrentUser, SessionCookie},
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/add", post(add))
        .route("/toggle/:id", get(toggle))
        .route("/delete/:id", get(delete))
        .route("/search", get(search))
        .route("/filter/:status", get(filter))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<NoticeQuery>,
) -> AppResult<Json<TaskListView>> {
    let tasks = state.tasks.list_for_user(&user).await?;
    let mut view = TaskListView::new(user, tasks);
    view.notice = q.notice;
    Ok(Json(view))
}

#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<AddTaskForm>,
) -> AppResult<Redirect> {
    state.tasks.create(&user, form.into()).await?;
    Ok(Redirect::to("/"))
}

/// Ids that do not parse are treated as missing tasks, after the session check.
async fn authorize_path(state: &AppState, cookie: &SessionCookie, raw_id: &str) -> AppResult<Task> {
    let Ok(task_id) = Uuid::parse_str(raw_id) else {
        state.sessions.require(cookie.token()).await?;
        return Err(AppError::NotFound);
    };
    let (_, task) = state.guard.authorize(cookie.token(), task_id).await?;
    Ok(task)
}

#[instrument(skip(state, cookie))]
pub async fn toggle(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    let task = authorize_path(&state, &cookie, &id).await?;
    state.tasks.toggle_complete(&task).await?;
    Ok(Redirect::to("/"))
}

#[instrument(skip(state, cookie))]
pub async fn delete(
    State(state): State<AppState>,
    cookie: SessionCookie,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    let task = authorize_path(&state, &cookie, &id).await?;
    state.tasks.delete(&task).await?;
    Ok(Redirect::to("/"))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn search(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<TaskListView>> {
    let tasks = state.tasks.search(&user, &q.q).await?;
    let mut view = TaskListView::new(user, tasks);
    view.search_query = Some(q.q);
    view.notice = q.notice;
    Ok(Json(view))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn filter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(status): Path<String>,
    Query(q): Query<NoticeQuery>,
) -> AppResult<Json<TaskListView>> {
    let status = StatusFilter::parse(&status);
    let tasks = state.tasks.filter(&user, status).await?;
    let mut view = TaskListView::new(user, tasks);
    view.status = Some(status);
    view.notice = q.notice;
    Ok(Json(view))
}
