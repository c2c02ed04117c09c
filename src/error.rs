use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tracing::error;

/// Notice shown for both a missing task and a task owned by someone else.
pub const TASK_UNAVAILABLE: &str = "Task not found or not allowed";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Username already taken")]
    DuplicateUsername,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("task not found")]
    NotFound,

    #[error("task belongs to another user")]
    Forbidden,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Message safe to show the end user.
    pub fn notice(&self) -> String {
        match self {
            AppError::NotFound | AppError::Forbidden => TASK_UNAVAILABLE.to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Sends recoverable errors back to `path` with a notice instead of the default target.
    pub fn redirect_back(self, path: &str) -> Response {
        match self {
            AppError::InvalidInput(_)
            | AppError::DuplicateUsername
            | AppError::InvalidCredentials => notice_redirect(path, &self.notice()),
            other => other.into_response(),
        }
    }
}

pub fn notice_redirect(path: &str, notice: &str) -> Response {
    Redirect::to(&format!("{}?notice={}", path, urlencoding::encode(notice))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthenticated => Redirect::to("/login").into_response(),
            AppError::InvalidCredentials => notice_redirect("/login", &self.notice()),
            AppError::DuplicateUsername => notice_redirect("/register", &self.notice()),
            AppError::InvalidInput(_) | AppError::NotFound | AppError::Forbidden => {
                notice_redirect("/", &self.notice())
            }
            AppError::Internal(ref e) => {
                error!(error = %e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.notice()).into_response()
            }
        }
    }
}
