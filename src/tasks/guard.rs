use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use super::repo_types::Task;
use crate::auth::repo_types::User;
use crate::auth::session::{SessionManager, SessionToken};
use crate::error::{AppError, AppResult};
use crate::store::TaskStore;

/// Single entry point for "may this session touch this task".
#[derive(Clone)]
pub struct AuthorizationGuard {
    sessions: SessionManager,
    tasks: Arc<dyn TaskStore>,
}

impl AuthorizationGuard {
    pub fn new(sessions: SessionManager, tasks: Arc<dyn TaskStore>) -> Self {
        Self { sessions, tasks }
    }

    /// `NotFound` and `Forbidden` stay distinct here; the response layer renders them alike.
    pub async fn authorize(&self, token: Option<&SessionToken>, task_id: Uuid) -> AppResult<(User, Task)> {
        let user = self.sessions.require(token).await?;
        let task = self.tasks.get_task(task_id).await?.ok_or(AppError::NotFound)?;
        if task.user_id != user.id {
            warn!(user_id = %user.id, task_id = %task.id, owner_id = %task.user_id, "forbidden task access");
            return Err(AppError::Forbidden);
        }
        Ok((user, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::Credentials;
    use crate::store::MemoryStore;
    use crate::tasks::services::{CreateTask, TaskRepository};

    struct Fixture {
        guard: AuthorizationGuard,
        sessions: SessionManager,
        repo: TaskRepository,
        creds: Credentials,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let sessions = SessionManager::new(store.clone(), store.clone(), None);
        Fixture {
            guard: AuthorizationGuard::new(sessions.clone(), store.clone()),
            sessions,
            repo: TaskRepository::new(store.clone()),
            creds: Credentials::new(store),
        }
    }

    async fn login(f: &Fixture, name: &str) -> (User, SessionToken) {
        let user = f.creds.register(name, "pw").await.unwrap();
        let token = f.sessions.begin_session(&user).await.unwrap();
        (user, token)
    }

    #[tokio::test]
    async fn owner_is_authorized() {
        let f = fixture();
        let (alice, token) = login(&f, "alice").await;
        let task = f.repo.create(&alice, CreateTask::titled("Buy milk")).await.unwrap().unwrap();

        let (user, found) = f.guard.authorize(Some(&token), task.id).await.unwrap();
        assert_eq!(user.id, alice.id);
        assert_eq!(found.id, task.id);
    }

    #[tokio::test]
    async fn other_user_is_forbidden_and_task_untouched() {
        let f = fixture();
        let (alice, _) = login(&f, "alice").await;
        let (_, bob_token) = login(&f, "bob").await;
        let task = f.repo.create(&alice, CreateTask::titled("Buy milk")).await.unwrap().unwrap();

        let err = f.guard.authorize(Some(&bob_token), task.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        let still = f.repo.list_for_user(&alice).await.unwrap();
        assert_eq!(still, vec![task]);
    }

    #[tokio::test]
    async fn missing_task_is_not_found() {
        let f = fixture();
        let (_, token) = login(&f, "alice").await;
        let err = f.guard.authorize(Some(&token), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn anonymous_is_unauthenticated() {
        let f = fixture();
        let (alice, _) = login(&f, "alice").await;
        let task = f.repo.create(&alice, CreateTask::titled("x")).await.unwrap().unwrap();
        assert!(matches!(
            f.guard.authorize(None, task.id).await,
            Err(AppError::Unauthenticated)
        ));
    }
}
