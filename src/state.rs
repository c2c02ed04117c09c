use std::sync::Arc;

use time::Duration;

use crate::auth::services::Credentials;
use crate::auth::session::SessionManager;
use crate::config::AppConfig;
use crate::store::{MemoryStore, PgStore, SessionStore, TaskStore, UserStore};
use crate::tasks::guard::AuthorizationGuard;
use crate::tasks::services::TaskRepository;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub credentials: Credentials,
    pub sessions: SessionManager,
    pub guard: AuthorizationGuard,
    pub tasks: TaskRepository,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        if config.uses_memory_store() {
            tracing::warn!("using in-memory store; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            return Ok(Self::from_parts(config, store.clone(), store.clone(), store));
        }

        let store = Arc::new(PgStore::connect(&config).await?);
        store.migrate().await?;
        Ok(Self::from_parts(config, store.clone(), store.clone(), store))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let ttl = config.session.ttl_minutes.map(Duration::minutes);
        let session_manager = SessionManager::new(sessions, users.clone(), ttl);
        Self {
            credentials: Credentials::new(users),
            guard: AuthorizationGuard::new(session_manager.clone(), tasks.clone()),
            sessions: session_manager,
            tasks: TaskRepository::new(tasks),
            config,
        }
    }

    /// Memory-backed state for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: "memory://".into(),
            max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            session: crate::config::SessionConfig {
                cookie_name: "session".into(),
                cookie_secure: false,
                ttl_minutes: None,
            },
        });
        let store = Arc::new(MemoryStore::new());
        Self::from_parts(config, store.clone(), store.clone(), store)
    }
}
