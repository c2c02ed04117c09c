use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_PRIORITY: &str = "Normal";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub complete: bool,
    pub priority: String,
    pub deadline: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// Validated input for a task insert.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub deadline: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Done,
    Pending,
    #[default]
    All,
}

impl StatusFilter {
    /// Unknown labels fall back to `All`.
    pub fn parse(label: &str) -> Self {
        match label {
            "done" => StatusFilter::Done,
            "pending" => StatusFilter::Pending,
            _ => StatusFilter::All,
        }
    }

    pub fn complete(self) -> Option<bool> {
        match self {
            StatusFilter::Done => Some(true),
            StatusFilter::Pending => Some(false),
            StatusFilter::All => None,
        }
    }
}

/// Listing criteria; every listing is scoped to one owner.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub search: Option<String>,
    pub status: StatusFilter,
}

impl TaskQuery {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(complete) = self.status.complete() {
            if task.complete != complete {
                return false;
            }
        }
        match &self.search {
            Some(q) => {
                let q = q.to_lowercase();
                task.title.to_lowercase().contains(&q)
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&q))
            }
            None => true,
        }
    }
}
