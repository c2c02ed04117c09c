use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SessionStore, TaskStore, UserStore};
use crate::auth::repo_types::{Session, Theme, User};
use crate::tasks::repo_types::{NewTask, Task, TaskQuery};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    tasks: HashMap<Uuid, Task>,
    sessions: HashMap<String, Session>,
}

/// In-process store with the same semantics as the Postgres tables.
/// Every operation runs under a single write (or read) guard.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, username: &str, password_hash: &str) -> anyhow::Result<Option<User>> {
        let mut t = self.inner.write().await;
        if t.users.values().any(|u| u.username == username) {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            theme: Theme::default(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.insert(user.id, user.clone());
        Ok(Some(user))
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let t = self.inner.read().await;
        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn toggle_theme(&self, id: Uuid) -> anyhow::Result<Option<Theme>> {
        let mut t = self.inner.write().await;
        Ok(t.users.get_mut(&id).map(|u| {
            u.theme = u.theme.toggled();
            u.theme
        }))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: NewTask) -> anyhow::Result<Task> {
        let mut t = self.inner.write().await;
        anyhow::ensure!(t.users.contains_key(&task.user_id), "owner {} does not exist", task.user_id);
        let task = Task {
            id: task.id,
            user_id: task.user_id,
            title: task.title,
            description: task.description,
            complete: false,
            priority: task.priority,
            deadline: task.deadline,
            created_at: task.created_at,
        };
        t.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        Ok(self.inner.read().await.tasks.get(&id).cloned())
    }

    async fn toggle_task(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Task>> {
        let mut t = self.inner.write().await;
        Ok(t.tasks
            .get_mut(&id)
            .filter(|task| task.user_id == user_id)
            .map(|task| {
                task.complete = !task.complete;
                task.clone()
            }))
    }

    async fn delete_task(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.inner.write().await;
        let owned = t.tasks.get(&id).is_some_and(|task| task.user_id == user_id);
        if owned {
            t.tasks.remove(&id);
        }
        Ok(owned)
    }

    async fn list_tasks(&self, user_id: Uuid, query: &TaskQuery) -> anyhow::Result<Vec<Task>> {
        let t = self.inner.read().await;
        let mut rows: Vec<Task> = t
            .tasks
            .values()
            .filter(|task| task.user_id == user_id && query.matches(task))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: &Session) -> anyhow::Result<()> {
        let mut t = self.inner.write().await;
        t.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, token: &str) -> anyhow::Result<Option<Session>> {
        Ok(self.inner.read().await.sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> anyhow::Result<()> {
        self.inner.write().await.sessions.remove(token);
        Ok(())
    }

    async fn set_session_theme(&self, token: &str, theme: Theme) -> anyhow::Result<()> {
        if let Some(s) = self.inner.write().await.sessions.get_mut(token) {
            s.theme = theme;
        }
        Ok(())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let mut t = self.inner.write().await;
        let before = t.sessions.len();
        t.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - t.sessions.len()) as u64)
    }
}
