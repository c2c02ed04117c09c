use serde::{Deserialize, Serialize};

/// Form body for registration. No `Debug`: it carries a password.
#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub confirm_password: Option<String>,
}

/// Form body for login.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Transient notice carried on a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
}

/// View model for the login and register pages.
#[derive(Debug, Serialize)]
pub struct FormView {
    pub page: &'static str,
    pub notice: Option<String>,
}

