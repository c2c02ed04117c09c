use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{SessionStore, TaskStore, UserStore};
use crate::auth::repo_types::{Session, Theme, User};
use crate::config::AppConfig;
use crate::tasks::repo_types::{NewTask, Task, TaskQuery};

const USER_COLUMNS: &str = "id, username, password_hash, theme, created_at";
const TASK_COLUMNS: &str =
    "id, user_id, title, description, complete, priority, deadline, created_at";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self::new(db))
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

/// Escapes `\`, `%` and `_` so user input is matched literally by `LIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 2);
    out.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, username: &str, password_hash: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, password_hash, theme, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (username) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .bind(Theme::default().as_str())
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn toggle_theme(&self, id: Uuid) -> anyhow::Result<Option<Theme>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            UPDATE users
               SET theme = CASE theme WHEN 'dark' THEN 'light' ELSE 'dark' END
             WHERE id = $1
            RETURNING theme
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("toggle theme")?;
        row.map(|(theme,)| Theme::try_from(theme).map_err(anyhow::Error::from))
            .transpose()
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, task: NewTask) -> anyhow::Result<Task> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (id, user_id, title, description, complete, priority, deadline, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task.id)
        .bind(task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.priority)
        .bind(task.deadline)
        .bind(task.created_at)
        .fetch_one(&self.db)
        .await
        .context("insert task")?;
        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get task")?;
        Ok(task)
    }

    async fn toggle_task(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
               SET complete = NOT complete
             WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("toggle task")?;
        Ok(task)
    }

    async fn delete_task(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete task")?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_tasks(&self, user_id: Uuid, query: &TaskQuery) -> anyhow::Result<Vec<Task>> {
        let pattern = query.search.as_deref().map(like_pattern);
        let rows = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
              FROM tasks
             WHERE user_id = $1
               AND ($2::boolean IS NULL OR complete = $2)
               AND ($3::text IS NULL
                    OR title ILIKE $3 ESCAPE '\'
                    OR description ILIKE $3 ESCAPE '\')
             ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(query.status.complete())
        .bind(pattern)
        .fetch_all(&self.db)
        .await
        .context("list tasks")?;
        Ok(rows)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, session: &Session) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, theme, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.theme.as_str())
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.db)
        .await
        .context("insert session")?;
        Ok(())
    }

    async fn get_session(&self, token: &str) -> anyhow::Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT token, user_id, theme, created_at, expires_at
              FROM sessions
             WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .context("get session")?;
        Ok(session)
    }

    async fn delete_session(&self, token: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.db)
            .await
            .context("delete session")?;
        Ok(())
    }

    async fn set_session_theme(&self, token: &str, theme: Theme) -> anyhow::Result<()> {
        sqlx::query("UPDATE sessions SET theme = $2 WHERE token = $1")
            .bind(token)
            .bind(theme.as_str())
            .execute(&self.db)
            .await
            .context("update session theme")?;
        Ok(())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM sessions WHERE expires_at IS NOT NULL AND expires_at <= $1")
            .bind(now)
            .execute(&self.db)
            .await
            .context("delete expired sessions")?;
        Ok(res.rows_affected())
    }
}
