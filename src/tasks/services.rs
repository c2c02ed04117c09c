use std::sync::Arc;

use time::{format_description::BorrowedFormatItem, macros::format_description, OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::repo_types::{NewTask, StatusFilter, Task, TaskQuery, DEFAULT_PRIORITY};
use crate::auth::repo_types::User;
use crate::error::{AppError, AppResult};
use crate::store::TaskStore;

// `datetime-local` form value, with or without seconds.
const DEADLINE_MINUTES: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]T[hour]:[minute]");
const DEADLINE_SECONDS: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Raw task fields as submitted.
#[derive(Debug, Clone, Default)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub priority: Option<String>,
}

impl CreateTask {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }
}

/// Blank deadline means none. Interpreted as UTC.
pub fn parse_deadline(raw: Option<&str>) -> AppResult<Option<OffsetDateTime>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    PrimitiveDateTime::parse(raw, DEADLINE_MINUTES)
        .or_else(|_| PrimitiveDateTime::parse(raw, DEADLINE_SECONDS))
        .map(|dt| Some(dt.assume_utc()))
        .map_err(|_| AppError::InvalidInput(format!("Invalid deadline: {raw}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Task CRUD; every call is scoped to the given owner.
#[derive(Clone)]
pub struct TaskRepository {
    tasks: Arc<dyn TaskStore>,
}

impl TaskRepository {
    pub fn new(tasks: Arc<dyn TaskStore>) -> Self {
        Self { tasks }
    }

    /// `Ok(None)` when the title is blank; nothing is stored.
    #[instrument(skip(self, user, input), fields(user_id = %user.id))]
    pub async fn create(&self, user: &User, input: CreateTask) -> AppResult<Option<Task>> {
        let title = input.title.trim();
        if title.is_empty() {
            debug!("blank title, task discarded");
            return Ok(None);
        }
        let deadline = parse_deadline(input.deadline.as_deref())?;
        let priority = non_blank(input.priority)
            .map(|p| p.trim().to_string())
            .unwrap_or_else(|| DEFAULT_PRIORITY.to_string());

        let task = self
            .tasks
            .insert_task(NewTask {
                id: Uuid::new_v4(),
                user_id: user.id,
                title: title.to_string(),
                description: non_blank(input.description),
                priority,
                deadline,
                created_at: OffsetDateTime::now_utc(),
            })
            .await?;
        info!(task_id = %task.id, "task created");
        Ok(Some(task))
    }

    pub async fn toggle_complete(&self, task: &Task) -> AppResult<Task> {
        let task = self
            .tasks
            .toggle_task(task.user_id, task.id)
            .await?
            .ok_or(AppError::NotFound)?;
        debug!(task_id = %task.id, complete = task.complete, "task toggled");
        Ok(task)
    }

    pub async fn delete(&self, task: &Task) -> AppResult<()> {
        if !self.tasks.delete_task(task.user_id, task.id).await? {
            return Err(AppError::NotFound);
        }
        info!(task_id = %task.id, user_id = %task.user_id, "task deleted");
        Ok(())
    }

    pub async fn list_for_user(&self, user: &User) -> AppResult<Vec<Task>> {
        Ok(self.tasks.list_tasks(user.id, &TaskQuery::default()).await?)
    }

    /// Case-insensitive substring match on title or description. The query is
    /// matched as given; only the empty string lists everything.
    pub async fn search(&self, user: &User, query: &str) -> AppResult<Vec<Task>> {
        let query = TaskQuery {
            search: (!query.is_empty()).then(|| query.to_string()),
            status: StatusFilter::All,
        };
        Ok(self.tasks.list_tasks(user.id, &query).await?)
    }

    pub async fn filter(&self, user: &User, status: StatusFilter) -> AppResult<Vec<Task>> {
        let query = TaskQuery {
            search: None,
            status,
        };
        Ok(self.tasks.list_tasks(user.id, &query).await?)
    }
}
