//! Data-access traits consumed by the services.
//!
//! Each method is one atomic unit against the backing store. Mutations that
//! target a task also take the owner id, so a row can never be touched
//! through an id alone.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{Session, Theme, User};
use crate::tasks::repo_types::{NewTask, Task, TaskQuery};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns `None` when the username is already taken.
    async fn insert_user(&self, username: &str, password_hash: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Flips the stored theme and returns the new value.
    async fn toggle_theme(&self, id: Uuid) -> anyhow::Result<Option<Theme>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: NewTask) -> anyhow::Result<Task>;
    async fn get_task(&self, id: Uuid) -> anyhow::Result<Option<Task>>;
    async fn toggle_task(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Task>>;
    async fn delete_task(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<bool>;
    /// Owner's tasks matching `query`, newest first.
    async fn list_tasks(&self, user_id: Uuid, query: &TaskQuery) -> anyhow::Result<Vec<Task>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: &Session) -> anyhow::Result<()>;
    async fn get_session(&self, token: &str) -> anyhow::Result<Option<Session>>;
    async fn delete_session(&self, token: &str) -> anyhow::Result<()>;
    async fn set_session_theme(&self, token: &str, theme: Theme) -> anyhow::Result<()>;
    async fn delete_expired(&self, now: OffsetDateTime) -> anyhow::Result<u64>;
}
