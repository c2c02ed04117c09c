use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{StatusFilter, Task};
use super::services::CreateTask;
use crate::auth::repo_types::{Theme, User};

#[derive(Debug, Deserialize)]
pub struct AddTaskForm {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub priority: Option<String>,
}

impl From<AddTaskForm> for CreateTask {
    fn from(f: AddTaskForm) -> Self {
        CreateTask {
            title: f.title,
            description: f.description,
            deadline: f.deadline,
            priority: f.priority,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub notice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub complete: bool,
    pub priority: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub deadline: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub overdue: bool,
}

impl TaskView {
    pub fn new(task: Task, now: OffsetDateTime) -> Self {
        let overdue = !task.complete && task.deadline.is_some_and(|d| d < now);
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            complete: task.complete,
            priority: task.priority,
            deadline: task.deadline,
            created_at: task.created_at,
            overdue,
        }
    }
}

/// What the index, search and filter pages render.
#[derive(Debug, Serialize)]
pub struct TaskListView {
    pub username: String,
    pub theme: Theme,
    pub tasks: Vec<TaskView>,
    pub search_query: Option<String>,
    pub status: Option<StatusFilter>,
    pub notice: Option<String>,
}

impl TaskListView {
    pub fn new(user: User, tasks: Vec<Task>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            username: user.username,
            theme: user.theme,
            tasks: tasks.into_iter().map(|t| TaskView::new(t, now)).collect(),
            search_query: None,
            status: None,
            notice: None,
        }
    }
}
