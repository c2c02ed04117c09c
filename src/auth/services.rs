use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::password::{hash_password, verify_against_dummy, verify_password};
use super::repo_types::User;
use crate::error::{AppError, AppResult};
use crate::store::UserStore;

/// Account registration and password verification.
#[derive(Clone)]
pub struct Credentials {
    users: Arc<dyn UserStore>,
}

impl Credentials {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> AppResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::InvalidInput("Username is required".into()));
        }
        if password.is_empty() {
            return Err(AppError::InvalidInput("Password is required".into()));
        }

        let hash = hash_password(password)?;
        match self.users.insert_user(username, &hash).await? {
            Some(user) => {
                info!(user_id = %user.id, username = %user.username, "user registered");
                Ok(user)
            }
            None => {
                warn!(username, "username already registered");
                Err(AppError::DuplicateUsername)
            }
        }
    }

    /// Unknown username and wrong password fail the same way.
    #[instrument(skip(self, password))]
    pub async fn verify(&self, username: &str, password: &str) -> AppResult<User> {
        let username = username.trim();
        let Some(user) = self.users.find_by_username(username).await? else {
            verify_against_dummy(password);
            warn!(username, "login unknown username");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::Theme;
    use crate::store::MemoryStore;

    fn credentials() -> Credentials {
        Credentials::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn register_creates_light_themed_user() {
        let creds = credentials();
        let user = creds.register("  alice ", "s3cret").await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.theme, Theme::Light);
        assert_ne!(user.password_hash, "s3cret");
    }

    #[tokio::test]
    async fn register_rejects_blank_fields() {
        let creds = credentials();
        assert!(matches!(creds.register("   ", "pw").await, Err(AppError::InvalidInput(_))));
        assert!(matches!(creds.register("alice", "").await, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_original_account() {
        let creds = credentials();
        let first = creds.register("alice", "s3cret").await.unwrap();
        let err = creds.register("alice", "other").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));

        let again = creds.verify("alice", "s3cret").await.unwrap();
        assert_eq!(again.id, first.id);
        assert!(matches!(
            creds.verify("alice", "other").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_fail_identically() {
        let creds = credentials();
        creds.register("alice", "s3cret").await.unwrap();

        let unknown = creds.verify("mallory", "s3cret").await.unwrap_err();
        let wrong = creds.verify("alice", "guess").await.unwrap_err();
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert_eq!(unknown.notice(), wrong.notice());
    }
}
